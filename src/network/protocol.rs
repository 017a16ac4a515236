//! Port and service tables

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Ports raced by the liveness check, in submission order
pub const LIVENESS_PORTS: [u16; 8] = [80, 443, 22, 21, 23, 25, 53, 3389];

/// Ports whose presence marks a host as serving web content
pub const WEB_PORTS: [u16; 6] = [80, 443, 8080, 3000, 5000, 8000];

/// Port probed when hunting for Flask development servers
pub const FLASK_PORT: u16 = 5000;

/// One row of the service table probed on live hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServicePort {
    pub port: u16,
    pub service: &'static str,
}

impl ServicePort {
    pub const fn new(port: u16, service: &'static str) -> Self {
        Self { port, service }
    }
}

/// A development-server port and the kind of developer it suggests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DevServicePort {
    pub port: u16,
    pub service: &'static str,
    pub role: &'static str,
}

/// Well-known services, followed by developer tooling. Order is significant:
/// port findings are reported in this order.
pub static SERVICE_TABLE: [ServicePort; 18] = [
    ServicePort::new(21, "FTP"),
    ServicePort::new(22, "SSH"),
    ServicePort::new(23, "Telnet"),
    ServicePort::new(25, "SMTP"),
    ServicePort::new(53, "DNS"),
    ServicePort::new(80, "HTTP"),
    ServicePort::new(110, "POP3"),
    ServicePort::new(143, "IMAP"),
    ServicePort::new(443, "HTTPS"),
    ServicePort::new(445, "SMB"),
    ServicePort::new(3389, "RDP"),
    ServicePort::new(5900, "VNC"),
    ServicePort::new(8080, "HTTP-Alt"),
    ServicePort::new(3000, "React/Node Dev Server"),
    ServicePort::new(5000, "Flask Dev Server"),
    ServicePort::new(8000, "Django Dev Server"),
    ServicePort::new(4200, "Angular Dev Server"),
    ServicePort::new(5173, "Vite Dev Server"),
];

/// Developer-tooling ports. The first entry that matches a host decides its role.
pub static DEV_TABLE: [DevServicePort; 6] = [
    DevServicePort {
        port: 3000,
        service: "React/Node Dev Server",
        role: "JavaScript Developer",
    },
    DevServicePort {
        port: 5000,
        service: "Flask Dev Server",
        role: "Python Developer",
    },
    DevServicePort {
        port: 8000,
        service: "Django Dev Server",
        role: "Python Developer",
    },
    DevServicePort {
        port: 8080,
        service: "Java/Tomcat",
        role: "Java Developer",
    },
    DevServicePort {
        port: 4200,
        service: "Angular Dev Server",
        role: "Angular Developer",
    },
    DevServicePort {
        port: 5173,
        service: "Vite Dev Server",
        role: "Frontend Developer",
    },
];

static SERVICE_NAMES: Lazy<HashMap<u16, &'static str>> = Lazy::new(|| {
    let mut names = HashMap::new();
    names.insert(22, "SSH");
    names.insert(80, "HTTP");
    names.insert(443, "HTTPS");
    names.insert(3000, "React/Node Dev Server");
    names.insert(5000, "Flask Dev Server");
    names.insert(8000, "Django Dev Server");
    names.insert(8080, "Tomcat/Dev Server");
    names.insert(3306, "MySQL");
    names.insert(5432, "PostgreSQL");
    names.insert(27017, "MongoDB");
    names.insert(6379, "Redis");
    names.insert(9200, "Elasticsearch");
    names.insert(3389, "RDP");
    names.insert(5900, "VNC");
    names
});

/// Lookups over the static port tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ServiceDatabase;

impl ServiceDatabase {
    pub fn new() -> Self {
        Self
    }

    /// The table probed on every live host
    pub fn service_table(&self) -> &'static [ServicePort] {
        &SERVICE_TABLE
    }

    pub fn dev_table(&self) -> &'static [DevServicePort] {
        &DEV_TABLE
    }

    /// Label for a port in the service table, if it is one
    pub fn table_service(&self, port: u16) -> Option<&'static str> {
        SERVICE_TABLE
            .iter()
            .find(|entry| entry.port == port)
            .map(|entry| entry.service)
    }

    /// Human-readable service name for any port
    pub fn service_name(&self, port: u16) -> String {
        match SERVICE_NAMES.get(&port) {
            Some(name) => name.to_string(),
            None => match self.table_service(port) {
                Some(name) => name.to_string(),
                None => format!("Service {}", port),
            },
        }
    }

    pub fn is_web_port(&self, port: u16) -> bool {
        WEB_PORTS.contains(&port)
    }

    pub fn dev_entry(&self, port: u16) -> Option<&'static DevServicePort> {
        DEV_TABLE.iter().find(|entry| entry.port == port)
    }
}

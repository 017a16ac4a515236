//! Output formatting and management

pub mod summary;

use crate::discovery::{DeepScanReport, ScanEvent};
use crate::network::interface::LocalInterface;
use crate::output::summary::{HostSummary, SummaryReport};
use crate::ScanError;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::net::Ipv4Addr;
use std::path::PathBuf;

/// Output format options
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub file: Option<PathBuf>,
    pub colored: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            file: None,
            colored: true,
        }
    }
}

/// Main output manager
pub struct OutputManager {
    config: OutputConfig,
}

impl OutputManager {
    pub fn new(config: OutputConfig) -> Self {
        if !config.colored {
            colored::control::set_override(false);
        }
        Self { config }
    }

    pub fn format(&self) -> OutputFormat {
        self.config.format
    }

    /// Render a scan summary in the configured format
    pub fn render(&self, report: &SummaryReport) -> crate::Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(self.format_text(report)),
            OutputFormat::Json => to_json(report),
            OutputFormat::Csv => self.format_csv(&report.hosts),
        }
    }

    /// Render only the hosts with an inferred developer role
    pub fn render_developers(&self, report: &SummaryReport) -> crate::Result<String> {
        let developers: Vec<HostSummary> = report.developers().into_iter().cloned().collect();

        match self.config.format {
            OutputFormat::Json => to_json(&developers),
            OutputFormat::Csv => self.format_csv(&developers),
            OutputFormat::Text => {
                if developers.is_empty() {
                    return Ok(format!("{}\n", "No developer machines found".yellow()));
                }

                let mut output = format!(
                    "\n{}\n",
                    "Developer Machines Found:".bright_magenta().bold()
                );
                for host in &developers {
                    output.push_str(&format!("\n  {}\n", host.address.to_string().bright_cyan()));
                    output.push_str(&format!(
                        "    Type:     {}\n",
                        host.role.as_deref().unwrap_or("-")
                    ));
                    output.push_str(&format!("    Services: {}\n", host.services.join(", ")));
                }
                Ok(output)
            }
        }
    }

    pub fn render_deep_scan(&self, report: &DeepScanReport) -> crate::Result<String> {
        match self.config.format {
            OutputFormat::Text => Ok(self.format_deep_scan(report)),
            OutputFormat::Json => to_json(report),
            OutputFormat::Csv => self.format_csv(&[HostSummary::from_profile(&report.profile)]),
        }
    }

    pub fn render_interfaces(&self, interfaces: &[LocalInterface]) -> crate::Result<String> {
        match self.config.format {
            OutputFormat::Json => to_json(&interfaces),
            _ => {
                if interfaces.is_empty() {
                    return Ok(format!("{}\n", "No active IPv4 interfaces found".yellow()));
                }

                let mut output = format!("{}\n", "Network Interfaces:".bright_cyan().bold());
                for iface in interfaces {
                    output.push_str(&format!(
                        "  {:<12} {:<16} {:<18} {}\n",
                        iface.name.bright_white().bold(),
                        iface.address,
                        iface.cidr().bright_green(),
                        iface.mac.as_deref().unwrap_or("-")
                    ));
                }
                Ok(output)
            }
        }
    }

    pub fn render_servers(&self, port: u16, servers: &[Ipv4Addr]) -> crate::Result<String> {
        match self.config.format {
            OutputFormat::Json => to_json(&serde_json::json!({
                "port": port,
                "servers": servers,
            })),
            _ => {
                if servers.is_empty() {
                    return Ok(format!("No hosts with tcp/{} open\n", port));
                }

                let mut output = format!(
                    "{}\n",
                    format!("Hosts with tcp/{} open:", port).bright_cyan().bold()
                );
                for server in servers {
                    output.push_str(&format!("  {}\n", format!("{}:{}", server, port).bright_green()));
                }
                Ok(output)
            }
        }
    }

    /// Write rendered output to the configured file, or stdout
    pub fn emit(&self, rendered: &str) -> crate::Result<()> {
        match &self.config.file {
            Some(path) => {
                let mut file = File::create(path)?;
                file.write_all(rendered.as_bytes())?;
                log::info!("Results written to {}", path.display());
            }
            None => print!("{}", rendered),
        }
        Ok(())
    }

    fn format_text(&self, report: &SummaryReport) -> String {
        let mut output = String::new();

        output.push_str(&format!("\n{}\n", "Scan Summary".bright_cyan().bold()));
        output.push_str(&format!("  Target:        {}\n", report.target.bright_white()));
        output.push_str(&format!("  Status:        {}\n", report.status));
        output.push_str(&format!("  Hosts probed:  {}\n", report.total_probed));
        output.push_str(&format!(
            "  Alive:         {}\n",
            report.total_alive.to_string().bright_green()
        ));
        output.push_str(&format!("  Inactive:      {}\n", report.total_inactive));
        output.push_str(&format!("  Success rate:  {:.1}%\n", report.success_rate));
        output.push_str(&format!("  Open ports:    {}\n", report.total_open_ports));
        output.push_str(&format!("  Web servers:   {}\n", report.web_servers));
        output.push_str(&format!("  Developers:    {}\n\n", report.developer_machines));

        if report.hosts.is_empty() {
            output.push_str(&format!("{}\n", "No live hosts found".yellow()));
            return output;
        }

        output.push_str(&format!("{}\n", "Live Hosts:".bright_green().bold()));
        output.push_str(&format!(
            "  {:<16} {:<6} {:<22} {:<22} {:<7} {}\n",
            "ADDRESS", "VIA", "CATEGORY", "ROLE", "RISK", "PORTS"
        ));
        for host in &report.hosts {
            output.push_str(&format!(
                "  {:<16} {:<6} {:<22} {:<22} {:<7} {}\n",
                host.address.to_string(),
                host.liveness.as_str(),
                host.category.label(),
                host.role.as_deref().unwrap_or("-"),
                paint_risk(host),
                join_ports(&host.open_ports, ", ")
            ));
        }

        if !report.roles.is_empty() {
            output.push_str(&format!("\n{}\n", "Developer Activity:".bright_magenta().bold()));
            for (role, count) in &report.roles {
                output.push_str(&format!("  {:<22} {}\n", role, count));
            }
        }

        output
    }

    fn format_deep_scan(&self, report: &DeepScanReport) -> String {
        let profile = &report.profile;
        let mut output = format!(
            "\n{} {}\n",
            "Deep scan:".bright_cyan().bold(),
            profile.address.to_string().bright_white()
        );

        let liveness = if report.outcome.alive {
            format!("alive via {}", report.outcome.method).bright_green()
        } else {
            "no liveness response".yellow()
        };
        output.push_str(&format!("  Liveness:  {}\n", liveness));
        output.push_str(&format!("  Category:  {}\n", profile.category));
        output.push_str(&format!(
            "  Role:      {}\n",
            profile.role.as_deref().unwrap_or("-")
        ));
        output.push_str(&format!("  Risk:      {}\n", profile.risk));

        if report.findings.is_empty() {
            output.push_str("  No open ports in the service table\n");
        } else {
            output.push_str(&format!("  {}\n", "Open ports:".bright_green().bold()));
            for finding in &report.findings {
                output.push_str(&format!("    {:<6} {}\n", finding.port, finding.service));
            }
        }

        output
    }

    fn format_csv(&self, hosts: &[HostSummary]) -> crate::Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());

        writer
            .write_record(["address", "liveness", "category", "role", "risk", "open_ports"])
            .map_err(csv_error)?;

        for host in hosts {
            writer
                .write_record([
                    host.address.to_string(),
                    host.liveness.to_string(),
                    host.category.label().to_string(),
                    host.role.clone().unwrap_or_default(),
                    host.risk.to_string(),
                    join_ports(&host.open_ports, ";"),
                ])
                .map_err(csv_error)?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ScanError::OutputError(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ScanError::OutputError(e.to_string()))
    }
}

/// Progress bar fed by [`ScanEvent`]s
pub struct ProgressDisplay {
    bar: ProgressBar,
}

impl ProgressDisplay {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} Discovering [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    /// A display that draws nothing, for machine-readable output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn handle(&self, event: &ScanEvent) {
        match event {
            ScanEvent::Progress(progress) => {
                self.bar.set_position(progress.completed as u64);
                if progress.latest.alive {
                    self.bar
                        .set_message(format!("{} up", progress.latest.address));
                }
            }
            ScanEvent::Finished(_) => self.finish(),
        }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> crate::Result<String> {
    serde_json::to_string_pretty(value)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| ScanError::OutputError(e.to_string()))
}

fn csv_error(e: csv::Error) -> ScanError {
    ScanError::OutputError(e.to_string())
}

fn join_ports(ports: &[u16], separator: &str) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

fn paint_risk(host: &HostSummary) -> ColoredString {
    let label = host.risk.to_string();
    match host.risk {
        crate::RiskLevel::Low => label.green(),
        crate::RiskLevel::Medium => label.yellow(),
        crate::RiskLevel::High => label.red().bold(),
    }
}

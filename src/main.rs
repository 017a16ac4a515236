use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use hypescan::{
    config::ScanConfig,
    discovery::{HostDiscoveryEngine, ScanEvent},
    network::interface::{default_range, list_interfaces},
    network::protocol::FLASK_PORT,
    output::{OutputConfig, OutputFormat, OutputManager, ProgressDisplay},
    AddressRange, ResultAggregator, ScanError, ScanSession,
};
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

// Ulimit adjustment for Unix systems
#[cfg(unix)]
fn adjust_ulimit_size(wanted: u64) -> u64 {
    use rlimit::Resource;

    match Resource::NOFILE.get() {
        Ok((soft, hard)) if soft < wanted => {
            let target = wanted.min(hard);
            if Resource::NOFILE.set(target, hard).is_ok() {
                log::debug!("Raised open-file limit from {} to {}", soft, target);
                target
            } else {
                log::warn!("Could not raise open-file limit above {}", soft);
                soft
            }
        }
        Ok((soft, _)) => soft,
        Err(e) => {
            log::warn!("Could not read open-file limit: {}", e);
            wanted
        }
    }
}

#[cfg(not(unix))]
fn adjust_ulimit_size(wanted: u64) -> u64 {
    wanted
}

fn cli() -> Command {
    let network_arg = Arg::new("network")
        .short('n')
        .long("network")
        .value_name("CIDR")
        .help("Subnet to scan (defaults to the first active interface)");

    Command::new("hypescan")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Local network host discovery and device profiling")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .help("Output format: text, json or csv")
                .default_value("text")
                .global(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Write results to FILE instead of stdout")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .help("Load settings from a TOML file (default: ~/.hypescan.toml)")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("scan")
                .about("Find live hosts on a subnet")
                .arg(network_arg.clone())
                .arg(
                    Arg::new("concurrency")
                        .short('c')
                        .long("concurrency")
                        .value_name("N")
                        .help("Maximum hosts probed at once")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("ports")
                        .short('p')
                        .long("ports")
                        .help("Probe the service table on every live host")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("timeout")
                        .short('t')
                        .long("timeout")
                        .value_name("MS")
                        .help("TCP liveness timeout in milliseconds")
                        .value_parser(clap::value_parser!(u64)),
                ),
        )
        .subcommand(Command::new("interfaces").about("List active IPv4 network interfaces"))
        .subcommand(
            Command::new("classify")
                .about("Discover and profile every device on the local network")
                .arg(network_arg.clone()),
        )
        .subcommand(
            Command::new("find-devs")
                .about("Profile the local network and list developer machines")
                .arg(network_arg.clone()),
        )
        .subcommand(
            Command::new("find-port")
                .about("Find hosts with one TCP port open (default: Flask on 5000)")
                .arg(
                    Arg::new("port")
                        .value_name("PORT")
                        .default_value("5000")
                        .value_parser(clap::value_parser!(u16))
                        .index(1),
                )
                .arg(network_arg),
        )
        .subcommand(
            Command::new("deepscan")
                .about("Probe every service port on a single host")
                .arg(
                    Arg::new("address")
                        .value_name("IP")
                        .required(true)
                        .value_parser(clap::value_parser!(Ipv4Addr))
                        .index(1),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> anyhow::Result<ScanConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => ScanConfig::from_toml_file(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(ScanConfig::load_default_config()),
    }
}

fn target_range(matches: &ArgMatches) -> anyhow::Result<AddressRange> {
    match matches.get_one::<String>("network") {
        Some(cidr) => Ok(AddressRange::parse(cidr)?),
        None => Ok(default_range()?),
    }
}

/// Which part of a finished scan gets rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportView {
    Summary,
    Developers,
}

/// Profiling settings that keep the liveness setup of the loaded config
fn profiling_config(config: ScanConfig) -> ScanConfig {
    ScanConfig {
        liveness_ports: config.liveness_ports,
        http_port: config.http_port,
        ..ScanConfig::profiling()
    }
}

/// Cancel `token` on Ctrl-C so in-flight probes drain before exit
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "[~] Interrupted, draining in-flight probes...".bright_yellow());
            token.cancel();
        }
    });
}

async fn run_scan(
    range: AddressRange,
    config: ScanConfig,
    output: &OutputManager,
    view: ReportView,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engine = HostDiscoveryEngine::new(config)?.with_events(tx);

    let display = if output.format() == OutputFormat::Text {
        ProgressDisplay::new(range.len())
    } else {
        ProgressDisplay::hidden()
    };
    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            display.handle(&event);
            if matches!(event, ScanEvent::Finished(_)) {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    let result = engine.scan_with_cancel(&range, cancel).await;
    drop(engine);
    let _ = progress.await;

    match result {
        Ok(session) => report_session(&session, output, view),
        Err(ScanError::Aborted { reason, partial }) => {
            eprintln!("{} {}", "[!] Scan aborted:".bright_red(), reason);
            report_session(&partial, output, view)?;
            process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn report_session(
    session: &ScanSession,
    output: &OutputManager,
    view: ReportView,
) -> anyhow::Result<()> {
    let summary = ResultAggregator::finalize(session);
    let rendered = match view {
        ReportView::Summary => output.render(&summary)?,
        ReportView::Developers => output.render_developers(&summary)?,
    };
    output.emit(&rendered)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let default_level = if matches.get_flag("verbose") { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let format = matches
        .get_one::<String>("format")
        .map(|f| f.parse::<OutputFormat>())
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or(OutputFormat::Text);

    let output = OutputManager::new(OutputConfig {
        format,
        file: matches.get_one::<PathBuf>("output").cloned(),
        colored: !matches.get_flag("no-color"),
    });

    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("scan", sub)) => {
            let mut config = config;
            if let Some(&concurrency) = sub.get_one::<usize>("concurrency") {
                config = config.with_concurrency(concurrency);
            }
            if let Some(&timeout) = sub.get_one::<u64>("timeout") {
                config = config.with_timeout(timeout);
            }
            if sub.get_flag("ports") {
                config = config.with_port_scan(true);
            }

            adjust_ulimit_size((config.concurrency * config.liveness_ports.len()) as u64 + 256);
            run_scan(target_range(sub)?, config, &output, ReportView::Summary).await
        }
        Some(("interfaces", _)) => {
            output.emit(&output.render_interfaces(&list_interfaces())?)?;
            Ok(())
        }
        Some((command @ ("classify" | "find-devs"), sub)) => {
            let config = profiling_config(config);
            let view = if command == "find-devs" {
                ReportView::Developers
            } else {
                ReportView::Summary
            };

            adjust_ulimit_size((config.concurrency * config.liveness_ports.len()) as u64 + 256);
            run_scan(target_range(sub)?, config, &output, view).await
        }
        Some(("find-port", sub)) => {
            let port = sub.get_one::<u16>("port").copied().unwrap_or(FLASK_PORT);
            let range = target_range(sub)?;

            adjust_ulimit_size(config.concurrency as u64 + 256);
            let engine = HostDiscoveryEngine::new(config)?;
            match engine.find_servers_on_port(&range, port).await {
                Ok(servers) => {
                    output.emit(&output.render_servers(port, &servers)?)?;
                    Ok(())
                }
                Err(ScanError::SweepAborted { reason, partial }) => {
                    eprintln!("{} {}", "[!] Sweep aborted:".bright_red(), reason);
                    output.emit(&output.render_servers(port, &partial)?)?;
                    process::exit(1);
                }
                Err(e) => Err(e.into()),
            }
        }
        Some(("deepscan", sub)) => {
            let address = sub
                .get_one::<Ipv4Addr>("address")
                .copied()
                .context("an IPv4 address is required")?;

            let engine = HostDiscoveryEngine::new(config)?;
            let report = engine.deep_scan(address).await?;
            output.emit(&output.render_deep_scan(&report)?)?;
            Ok(())
        }
        _ => {
            cli().print_help()?;
            Ok(())
        }
    }
}

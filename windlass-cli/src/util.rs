//! Terminal output helpers

use windlass_core::monitoring::{HostInfo, StatusSnapshot, format_rate};

use crate::error::CliError;

/// Prints one snapshot as a table or as JSON
pub fn print_snapshot(snapshot: &StatusSnapshot, json: bool) -> Result<(), CliError> {
    if json {
        println!("{}", serde_json::to_string_pretty(snapshot)?);
        return Ok(());
    }

    println!("-- {} --", snapshot.timestamp.format("%H:%M:%S"));
    match &snapshot.cpu_core_usage {
        Some(cores) => {
            let rendered: Vec<String> = cores.iter().map(|pct| format!("{pct:.0}%")).collect();
            println!("cpu:  {}", rendered.join(" "));
        }
        None => println!("cpu:  (unavailable)"),
    }
    match &snapshot.interfaces {
        Some(interfaces) => {
            for iface in interfaces {
                println!(
                    "net:  {:<8} in {:>10}  out {:>10}",
                    iface.name,
                    format_rate(iface.in_rate),
                    format_rate(iface.out_rate)
                );
            }
        }
        None => println!("net:  (unavailable)"),
    }
    match &snapshot.disks {
        Some(disks) => {
            for disk in disks {
                println!(
                    "disk: {:<8} read {:>10}  write {:>10}",
                    disk.name,
                    format_rate(disk.read_rate),
                    format_rate(disk.write_rate)
                );
            }
        }
        None => println!("disk: (unavailable)"),
    }
    Ok(())
}

/// Prints the one-time host facts header
pub fn print_host_info(info: &HostInfo) {
    let days = info.uptime_secs / 86_400;
    let hours = (info.uptime_secs % 86_400) / 3_600;
    println!(
        "{} ({}, {} cores, up {}d {}h)",
        info.hostname, info.os_release, info.cpu_cores, days, hours
    );
}

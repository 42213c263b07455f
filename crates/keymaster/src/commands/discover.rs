use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use colored::Colorize;
use keymaster_core::{discover, DiscoveryRequest, SuppaFtpConnector};

use super::{format_event, url_source};

pub struct DiscoverArgs {
    pub server_config_url: String,
    pub ftp_address: String,
    pub login_name: String,
    pub password: String,
    pub ftp_dir: String,
}

pub fn discover_server(args: DiscoverArgs, settings: &AppConfig) -> miette::Result<()> {
    let source = url_source(settings)?;
    let request = DiscoveryRequest {
        server_config_url: args.server_config_url,
        ftp_address: args.ftp_address,
        ftp_user: args.login_name,
        ftp_password: args.password,
        ftp_dir: args.ftp_dir,
    };

    let report = discover(&source, &SuppaFtpConnector, &request, &|event| {
        println_pad!("{}", format_event(event))
    })
    .map_err(CliError::from)?;
    println!();

    println_pad!(
        "{} {}",
        "🖥️  Server:".bright_blue().bold(),
        report
            .server_name
            .as_deref()
            .unwrap_or("(unnamed)")
            .bright_cyan()
            .bold()
    );

    println_pad!(
        "\n{} {}",
        "🧩 Mods:".bright_magenta().bold(),
        report.mods.len()
    );
    for mod_name in &report.mods {
        println_pad!("   {} {}", "•".bright_cyan(), mod_name);
    }

    println_pad!(
        "\n{} {}",
        "📂 Remote files in".bright_magenta().bold(),
        request.ftp_dir.bright_white()
    );
    if report.remote_files.is_empty() {
        println_pad!("   {}", "(empty)".dimmed());
    }
    for file in &report.remote_files {
        if file.is_key {
            println_pad!("   {} {}", "🔑".bright_green(), file.name.bright_green());
        } else {
            println_pad!("   {} {}", "•".dimmed(), file.name.dimmed());
        }
    }

    println_pad!(
        "\n{} {}",
        "Key files:".bright_blue().bold(),
        report.remote_keys().count()
    );

    Ok(())
}

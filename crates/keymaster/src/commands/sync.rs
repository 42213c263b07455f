use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::AppConfig;
use crate::utils::print_ansi_boxed_lines;
use colored::Colorize;
use keymaster_core::{
    RunConfig, StageOutcome, SuppaFtpConnector, SyncEvent, SyncPipeline, SyncPlan, SyncReport,
    DEFAULT_STAGING_DIR,
};

use super::url_source;

pub struct SyncArgs {
    pub config_url: String,
    pub staging_dir: Option<String>,
    pub dry_run: bool,
}

pub fn sync_keys(args: SyncArgs, settings: &AppConfig) -> miette::Result<()> {
    let source = url_source(settings)?;

    println_pad!(
        "{} {}",
        "📥 Run configuration:".bright_blue().bold(),
        args.config_url.bright_white()
    );
    let config = RunConfig::fetch(&source, &args.config_url).map_err(CliError::from)?;
    tracing::debug!("Loaded {:?}", config);

    let staging_dir = args
        .staging_dir
        .or_else(|| settings.staging_dir.clone())
        .unwrap_or_else(|| DEFAULT_STAGING_DIR.to_string());

    let pipeline = SyncPipeline::new(Box::new(source), Box::new(SuppaFtpConnector))
        .with_staging_dir(staging_dir)
        .with_events(|event| println_pad!("{}", format_event(event)));

    if args.dry_run {
        let plan = pipeline.plan(&config).map_err(CliError::from)?;

        println!();
        print_ansi_boxed_lines(&plan_lines(&plan));
        if let Some(par) = &plan.par {
            println_pad!(
                "\n{} {}",
                "📝 PAR file for".bright_magenta().bold(),
                par.ftp_path.bright_cyan()
            );
            println_pad!("{}", par.content);
        }
        println_pad!(
            "\n{}",
            "Dry run: no keys were downloaded and the FTP server was not touched.".dimmed()
        );
        return Ok(());
    }

    let report = pipeline.run(&config).map_err(CliError::from)?;

    println!();
    print_ansi_boxed_lines(&report_lines(&report));
    println_pad!("\n{}", "✅ Keys synchronized".bright_green().bold());

    Ok(())
}

/// One console line for a pipeline event.
pub fn format_event(event: &SyncEvent) -> String {
    let label = event.stage.label();
    match event.outcome {
        StageOutcome::Started => format!(
            "{} {} {}",
            "⏳".bright_blue(),
            label.bright_blue(),
            event.detail.dimmed()
        ),
        StageOutcome::Progress => format!("   {} {}", "•".bright_cyan(), event.detail),
        StageOutcome::Completed => format!(
            "{} {}: {}",
            "✔".bright_green(),
            label.bright_green(),
            event.detail
        ),
        StageOutcome::Skipped => format!(
            "{} {}: {}",
            "↷".yellow(),
            label.yellow(),
            event.detail.dimmed()
        ),
        StageOutcome::Failed => format!(
            "{} {}: {}",
            "✘".bright_red().bold(),
            label.bright_red().bold(),
            event.detail
        ),
    }
}

/// Summary of what a run resolved.
pub fn plan_lines(plan: &SyncPlan) -> Vec<String> {
    let mut lines = vec![
        format!(
            "{} {}",
            "Server:".bright_blue().bold(),
            plan.server_name
                .as_deref()
                .unwrap_or("(no server config)")
                .bright_white()
        ),
        format!("{} {}", "Mods:".bright_blue().bold(), plan.mods.len()),
        format!("{} {}", "Keys:".bright_blue().bold(), plan.keys.len()),
    ];

    for (key, requesters) in plan.keys.iter() {
        let requesters: Vec<&str> = requesters.iter().map(String::as_str).collect();
        lines.push(format!(
            "  {} {}",
            key.bright_cyan(),
            format!("({})", requesters.join(", ")).dimmed()
        ));
    }

    if !plan.blacklisted.is_empty() {
        lines.push(format!(
            "{} {}",
            "Blacklisted:".yellow().bold(),
            plan.blacklisted.join(", ")
        ));
    }

    match &plan.par {
        Some(par) => lines.push(format!(
            "{} {}{}",
            "PAR file:".bright_blue().bold(),
            par.ftp_path,
            match &par.server_startup {
                Some(mods) => format!(" ({} mod(s) in launch argument)", mods.len()),
                None => String::new(),
            }
        )),
        None => lines.push(format!(
            "{} {}",
            "PAR file:".bright_blue().bold(),
            "not configured".dimmed()
        )),
    }

    lines
}

/// Summary of a completed run.
pub fn report_lines(report: &SyncReport) -> Vec<String> {
    let mut lines = plan_lines(&report.plan);
    lines.push(format!(
        "{} {}",
        "Removed:".bright_blue().bold(),
        report.removed_files.len()
    ));
    lines.push(format!(
        "{} {}",
        "Uploaded:".bright_blue().bold(),
        report.uploaded_keys.len()
    ));
    lines.push(format!(
        "{} {}",
        "PAR replaced:".bright_blue().bold(),
        if report.par_replaced { "yes" } else { "no" }
    ));
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use keymaster_core::{ModSet, PlannedPar, RequiredKeys, SyncStage};

    fn plain() {
        colored::control::set_override(false);
    }

    fn plan() -> SyncPlan {
        let mut keys = RequiredKeys::new();
        keys.add("ace.bikey", "@ace");
        keys.add("ace.bikey", "@acex");
        keys.add("server.bikey", "Manual");
        SyncPlan {
            server_name: Some("Public".to_string()),
            mods: ["@ace", "@acex"].into_iter().collect::<ModSet>(),
            keys,
            blacklisted: vec!["old.bikey".to_string()],
            par: Some(PlannedPar {
                ftp_path: "/arma3/server.par".to_string(),
                content: String::new(),
                server_startup: Some(["@ace"].into_iter().collect()),
            }),
        }
    }

    #[test]
    fn test_plan_lines() {
        plain();
        assert_eq!(
            plan_lines(&plan()),
            vec![
                "Server: Public",
                "Mods: 2",
                "Keys: 2",
                "  ace.bikey (@ace, @acex)",
                "  server.bikey (Manual)",
                "Blacklisted: old.bikey",
                "PAR file: /arma3/server.par (1 mod(s) in launch argument)",
            ]
        );
    }

    #[test]
    fn test_report_lines() {
        plain();
        let report = SyncReport {
            plan: SyncPlan::default(),
            staged_keys: Vec::new(),
            removed_files: vec!["a.bikey".to_string()],
            uploaded_keys: Vec::new(),
            par_replaced: false,
        };
        let lines = report_lines(&report);
        assert_eq!(lines[0], "Server: (no server config)");
        assert!(lines.contains(&"PAR file: not configured".to_string()));
        assert_eq!(
            &lines[lines.len() - 3..],
            &["Removed: 1", "Uploaded: 0", "PAR replaced: no"]
        );
    }

    #[test]
    fn test_format_event() {
        plain();
        let event = SyncEvent::new(SyncStage::UploadingKeys, StageOutcome::Completed, "2 key(s)");
        assert_eq!(format_event(&event), "✔ Uploading keys: 2 key(s)");

        let event = SyncEvent::new(SyncStage::DownloadingKeys, StageOutcome::Progress, "ace.bikey");
        assert_eq!(format_event(&event), "   • ace.bikey");
    }
}

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use crate::utils::{print_ansi_boxed_lines, Verbosity};
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::Result;
use qk_consolidate::{ConsolidateEvent, ConsolidateResult, ConsolidateStage, Consolidator};

pub struct ConsolidateGamedirArgs {
    pub gamedir: Utf8PathBuf,
    pub config_path: Option<Utf8PathBuf>,
    pub output_name: Option<String>,
    pub verbosity: Verbosity,
}

pub fn consolidate_gamedir(args: ConsolidateGamedirArgs) -> Result<()> {
    let mut options = load_config(args.config_path.as_deref())?.consolidate;
    if let Some(output_name) = args.output_name {
        options.output_file_name = output_name;
    }

    let verbosity = args.verbosity;
    if verbosity > Verbosity::Quiet {
        println_pad!(
            "{} {}",
            "📦 Consolidating gamedir:".bright_blue().bold(),
            args.gamedir.as_str().bright_cyan().bold()
        );
    }

    let result = Consolidator::new(args.gamedir)
        .with_options(options)
        .with_reporter(move |event| report_event(verbosity, &event))
        .run()
        .map_err(CliError::from)?;

    if verbosity > Verbosity::Quiet {
        print_summary(&result);
    }
    Ok(())
}

fn report_event(verbosity: Verbosity, event: &ConsolidateEvent) {
    if verbosity == Verbosity::Quiet {
        return;
    }

    match event {
        ConsolidateEvent::StageStarted {
            stage,
            source,
            target,
        } => report_stage(*stage, source, target.as_deref()),
        ConsolidateEvent::ArchiveStarted {
            archive,
            staging_dir,
            current,
            total,
        } => println_pad!(
            "{} {} {} {}",
            format!("[{current}/{total}]").bright_black(),
            "Unpacking".bright_yellow(),
            file_name(archive).bright_white().bold(),
            format!("-> {}", file_name(staging_dir)).bright_black()
        ),
        ConsolidateEvent::EntryProcessed {
            stage,
            path,
            source,
            replaced,
        } if verbosity == Verbosity::Verbose => {
            let verb = match stage {
                ConsolidateStage::UnpackAll => "extract",
                ConsolidateStage::Overlay => "copy",
                _ => "add",
            };
            let marker = if *replaced {
                " (override)".bright_magenta().to_string()
            } else {
                String::new()
            };
            println_pad!(
                "  {} {}{} {}",
                format!("{verb:>7}").bright_black(),
                path,
                marker,
                format!("<- {}", file_name(source)).bright_black()
            );
        }
        ConsolidateEvent::EntryProcessed { .. } => {}
        ConsolidateEvent::Complete { .. } => {}
    }
}

fn report_stage(stage: ConsolidateStage, source: &Utf8Path, target: Option<&Utf8Path>) {
    match stage {
        ConsolidateStage::Init | ConsolidateStage::UnpackAll => {}
        ConsolidateStage::Overlay => println_pad!(
            "{} {} {}",
            "📁 Copying loose files from".bright_yellow(),
            source.as_str().bright_white(),
            format!("-> {}", target.map(file_name).unwrap_or_default()).bright_black()
        ),
        ConsolidateStage::Repack => println_pad!(
            "{} {}",
            "🗜️  Repacking into".bright_yellow(),
            target.map(Utf8Path::as_str).unwrap_or_default().bright_white().bold()
        ),
        ConsolidateStage::Cleanup => println_pad!(
            "{} {}",
            "🧹 Removing".bright_yellow(),
            source.as_str().bright_white()
        ),
    }
}

fn file_name(path: &Utf8Path) -> &str {
    path.file_name().unwrap_or(path.as_str())
}

fn print_summary(result: &ConsolidateResult) {
    println_pad!("{}", "✅ Consolidation complete!".bright_green().bold());
    print_ansi_boxed_lines(&[
        format!(
            "{} {}",
            "Output:".bright_white(),
            result.output_archive.as_str().bright_cyan().bold()
        ),
        format!(
            "{} {}",
            "Entries:".bright_white(),
            result.entries_written.to_string().bright_green()
        ),
        format!(
            "{} {}",
            "Archives:".bright_white(),
            result.archives_processed.to_string().bright_green()
        ),
        format!(
            "{} {}",
            "Loose files:".bright_white(),
            result.loose_files_applied.to_string().bright_green()
        ),
        format!(
            "{} {}",
            "Overridden:".bright_white(),
            result.paths_overridden.to_string().bright_magenta()
        ),
        format!(
            "{} {:.2?}",
            "Time:".bright_white(),
            result.elapsed
        ),
    ]);
}

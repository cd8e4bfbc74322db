//! Human-readable listings printed by the management flags.

use std::io::Write;
use std::path::Path;

use crossterm::queue;
use crossterm::style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor};
use itertools::Itertools;
use quick_sh_core::alias::{AliasKind, AliasMap, AliasValue};
use quick_sh_core::error::Result;
use quick_sh_core::language::{language_name, LanguageSource, SUPPORTED_LANGUAGES};
use quick_sh_core::locator::{ScriptInfo, ScriptKind};
use quick_sh_core::remote::{CachedScripts, SourceSummary};

const RULE_WIDTH: usize = 50;

/// Everything `q --list` shows.
pub struct StatusReport<'a> {
    pub script_root: &'a Path,
    pub aliases: &'a AliasMap,
    pub scripts: &'a [ScriptInfo],
    pub remote_scripts: &'a [CachedScripts],
}

fn heading(out: &mut impl Write, text: &str) -> Result<()> {
    queue!(
        out,
        SetAttribute(Attribute::Bold),
        Print(text),
        SetAttribute(Attribute::Reset),
        Print("\n")
    )?;
    Ok(())
}

fn highlighted(out: &mut impl Write, color: Color, text: &str) -> Result<()> {
    queue!(out, SetForegroundColor(color), Print(text), ResetColor)?;
    Ok(())
}

fn description_suffix(description: Option<&str>) -> String {
    description
        .filter(|description| !description.is_empty())
        .map(|description| format!(" - {description}"))
        .unwrap_or_default()
}

fn kind_title(kind: AliasKind) -> &'static str {
    match kind {
        AliasKind::Relative => "Project scripts:",
        AliasKind::Absolute => "Absolute path scripts:",
        AliasKind::System => "System command aliases:",
    }
}

fn print_aliases(out: &mut impl Write, aliases: &AliasMap) -> Result<()> {
    if aliases.is_empty() {
        return Ok(());
    }

    writeln!(out, "\nConfigured aliases:")?;

    let groups = aliases
        .entries()
        .filter_map(|(name, value)| match value {
            AliasValue::Target(target) => Some((name, target)),
            AliasValue::Malformed => None,
        })
        .into_group_map_by(|(_, target)| target.kind());

    for kind in [AliasKind::Relative, AliasKind::Absolute, AliasKind::System] {
        let Some(entries) = groups.get(&kind) else {
            continue;
        };

        writeln!(out, "  {}", kind_title(kind))?;
        for (name, target) in entries {
            write!(out, "    • ")?;
            highlighted(out, Color::Cyan, &format!("{name:<15}"))?;
            writeln!(
                out,
                " {}{}",
                target.bin(),
                description_suffix(target.description())
            )?;
        }
    }

    let malformed = aliases
        .entries()
        .filter(|(_, value)| matches!(value, AliasValue::Malformed))
        .map(|(name, _)| name)
        .join(", ");
    if !malformed.is_empty() {
        writeln!(out, "  Invalid aliases: {malformed}")?;
    }

    Ok(())
}

fn print_scripts(out: &mut impl Write, scripts: &[ScriptInfo]) -> Result<()> {
    if scripts.is_empty() {
        writeln!(out, "\nNo scripts found.")?;
        return Ok(());
    }

    writeln!(out, "\nAvailable scripts:")?;

    let by_directory = scripts
        .iter()
        .into_group_map_by(|script| script.parent().map(ToString::to_string));

    for (directory, entries) in by_directory
        .into_iter()
        .sorted_by(|(a, _), (b, _)| a.cmp(b))
    {
        match &directory {
            None => writeln!(out, "  (root):")?,
            Some(directory) => writeln!(out, "  {directory}/:")?,
        }

        for script in entries {
            let description = description_suffix(script.description.as_deref());
            match &script.kind {
                ScriptKind::Directory { entry } => {
                    write!(out, "    ")?;
                    highlighted(out, Color::Blue, &format!("{}/", script.name))?;
                    writeln!(out, " ({entry}){description}")?;
                }
                ScriptKind::File => {
                    write!(out, "    ")?;
                    highlighted(out, Color::Green, &format!("{:<20}", script.name))?;
                    writeln!(out, "{description}")?;
                }
            }
        }
    }

    Ok(())
}

fn print_cached(out: &mut impl Write, remote_scripts: &[CachedScripts]) -> Result<()> {
    for cached in remote_scripts {
        writeln!(out, "  {} ({}):", cached.source_name, cached.source_type)?;
        for script in &cached.scripts {
            writeln!(out, "    {script}")?;
        }
    }
    Ok(())
}

/// Prints the `q --list` overview.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_status(out: &mut impl Write, report: &StatusReport) -> Result<()> {
    write!(out, "Script directory: ")?;
    highlighted(out, Color::Yellow, &report.script_root.display().to_string())?;
    writeln!(out)?;

    print_aliases(out, report.aliases)?;
    print_scripts(out, report.scripts)?;

    writeln!(out)?;
    heading(out, "Remote scripts:")?;
    if report.remote_scripts.is_empty() {
        writeln!(out, "  No remote scripts downloaded.")?;
        writeln!(
            out,
            "  Use `q --download <source> <path>` to fetch one."
        )?;
    } else {
        print_cached(out, report.remote_scripts)?;
    }

    writeln!(out)?;
    heading(out, "Usage tips:")?;
    writeln!(out, "  q <alias>           run a configured alias")?;
    writeln!(out, "  q <script>          run a script, extension optional")?;
    writeln!(out, "  q <directory>       run the directory's index script")?;
    writeln!(out, "  q <remote-script>   run a downloaded script")?;
    writeln!(out, "  q --sources         manage remote sources")?;
    writeln!(out, "  q --help            show all options")?;

    out.flush()?;
    Ok(())
}

/// Prints the short usage shown when `q` is run without arguments.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_usage(out: &mut impl Write) -> Result<()> {
    heading(out, "quick-sh")?;
    writeln!(out, "Run scripts from your script directory by name.\n")?;
    writeln!(out, "Usage:")?;
    writeln!(out, "  q <script> [args...]    run a script")?;
    writeln!(out, "  q -l                    list scripts")?;
    writeln!(out, "  q -h, --help            show help")?;
    writeln!(out, "  q --path <dir>          set the script directory\n")?;
    writeln!(out, "Examples:")?;
    writeln!(out, "  q hello                 run the `hello` script")?;
    writeln!(out, "  q -l                    list scripts")?;
    out.flush()?;
    Ok(())
}

/// Prints the registered sources.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_sources(out: &mut impl Write, sources: &[SourceSummary]) -> Result<()> {
    if sources.is_empty() {
        writeln!(out, "No remote sources configured.")?;
        out.flush()?;
        return Ok(());
    }

    writeln!(out)?;
    heading(out, "Remote sources:")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

    for summary in sources {
        writeln!(out)?;
        highlighted(out, Color::Cyan, &summary.name)?;
        writeln!(out)?;
        writeln!(out, "  Type: {}", summary.source.source_type)?;
        writeln!(out, "  URL: {}", summary.source.url)?;
        if let Some(branch) = &summary.source.branch {
            writeln!(out, "  Branch: {branch}")?;
        }
        if let Some(added_at) = summary.source.added_at {
            writeln!(out, "  Added: {}", added_at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        writeln!(out, "  Downloaded scripts: {}", summary.script_count)?;
    }

    out.flush()?;
    Ok(())
}

/// Prints the downloaded scripts of every source.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_remote_scripts(out: &mut impl Write, remote_scripts: &[CachedScripts]) -> Result<()> {
    writeln!(out)?;
    heading(out, "Downloaded remote scripts:")?;
    writeln!(out, "{}", "=".repeat(RULE_WIDTH))?;

    let total: usize = remote_scripts.iter().map(|cached| cached.scripts.len()).sum();
    if total == 0 {
        writeln!(out, "No remote scripts downloaded.")?;
    } else {
        print_cached(out, remote_scripts)?;
        writeln!(out, "\nTotal: {total} script(s)")?;
    }

    out.flush()?;
    Ok(())
}

/// Prints the active language and the supported ones.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn print_language(
    out: &mut impl Write,
    active: &str,
    configured: Option<&str>,
    source: &LanguageSource,
) -> Result<()> {
    writeln!(
        out,
        "Current language: {} ({active})",
        language_name(active).unwrap_or(active)
    )?;
    match (source, configured) {
        (LanguageSource::Configured, Some(code)) => writeln!(out, "User setting: {code}")?,
        _ => writeln!(out, "User setting: auto-detected")?,
    }

    writeln!(out, "Supported languages:")?;
    for (code, name) in SUPPORTED_LANGUAGES {
        writeln!(out, "  {code:<4} {name}")?;
    }

    out.flush()?;
    Ok(())
}

use crate::config::Config;
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use trellis_dom::{format_fixes, parse_fragment, StructureFix, Tree};
use trellis_segments::{MarkerConfig, SegmentStore};

#[derive(Debug, Args)]
pub struct ParseArgs {
    /// Markup file to inspect
    pub file: PathBuf,
}

/// What a page's markup looks like to the segment store
#[derive(Debug)]
pub struct Inspection {
    pub registered: Vec<String>,
    pub broken: Vec<String>,
    pub fixes: Vec<StructureFix>,
}

pub fn inspect(source: &str, markers: MarkerConfig) -> Result<Inspection> {
    // Fix spans refer to `source`, so collect them from a standalone parse
    let mut scratch = Tree::new();
    let fixes = parse_fragment(&mut scratch, source).fixes;

    let mut store = SegmentStore::new(markers);
    store.load_document(source)?;
    let registered = store.register_document();
    let broken = store.take_broken();

    Ok(Inspection {
        registered,
        broken,
        fixes,
    })
}

pub fn parse(args: ParseArgs, config: &Config) -> Result<()> {
    let source = fs::read_to_string(&args.file)
        .with_context(|| format!("Cannot read {}", args.file.display()))?;
    let inspection = inspect(&source, config.engine.markers.clone())?;

    println!("{} {}", "Parsed".bright_blue().bold(), args.file.display());
    println!();

    if inspection.registered.is_empty() {
        println!("{}", "No segments found".yellow());
    } else {
        println!("Segments ({}):", inspection.registered.len());
        for segment_id in &inspection.registered {
            println!("  {} {}", "✓".green(), segment_id);
        }
    }

    if !inspection.broken.is_empty() {
        println!();
        println!("{}", "Broken segments:".red().bold());
        for segment_id in &inspection.broken {
            println!("  {} {}", "✗".red(), segment_id);
        }
    }

    if !inspection.fixes.is_empty() {
        println!();
        print!("{}", format_fixes(&source, &display_name(&args.file), &inspection.fixes));
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_reports_segments_and_fixes() {
        let source = concat!(
            r#"<span class="begin" data-segid="ok"></span><p>fine</p><span class="end" data-segid="ok"></span>"#,
            r#"<div><span class="begin" data-segid="torn"></span><b>open</div>"#,
        );

        let inspection = inspect(source, MarkerConfig::default()).unwrap();
        assert_eq!(inspection.registered, vec!["ok"]);
        assert_eq!(inspection.broken, vec!["torn"]);
        assert_eq!(inspection.fixes.len(), 1);
        assert_eq!(inspection.fixes[0].tag, "b");
    }

    #[test]
    fn test_inspect_honours_marker_config() {
        let markers = MarkerConfig {
            segment_id_attr: "data-seg".to_string(),
            ..Default::default()
        };
        let source = r#"<i class="begin" data-seg="x"></i>x<i class="end" data-seg="x"></i>"#;

        let inspection = inspect(source, markers).unwrap();
        assert_eq!(inspection.registered, vec!["x"]);
        assert!(inspection.broken.is_empty());
    }
}

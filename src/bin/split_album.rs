//! Split a vinyl side (or a whole album) recorded as one or more WAV files
//! into one file per track.
//!
//! Without --dry-run the proposed split is extracted right away; use
//! --dry-run (optionally with --json or --cue) to review it first.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

use vinylsplit::cuefile::{generate_cue_sheet, write_cue_sheet};
use vinylsplit::segment::{apply_track_names, drop_segments, find_short_segments};
use vinylsplit::{analyze_album, extract_segments, Config, ExpectedTracks, SplitError, TrackSegment};

#[derive(Parser, Debug)]
#[command(name = "split_album", about = "Split vinyl recordings into tracks")]
struct Args {
    /// Source files, in recording order
    #[arg(required_unless_present_any = ["save_defaults", "show_saved_defaults"])]
    files: Vec<PathBuf>,

    /// Sort the source files by file name before analysis
    #[arg(long)]
    sort: bool,

    /// Expected track durations, comma separated (m:ss, h:mm:ss or seconds; ? if unknown)
    #[arg(long, value_delimiter = ',')]
    durations: Vec<String>,

    /// Expected number of tracks
    #[arg(long)]
    tracks: Option<usize>,

    /// Track names, separated by ';'
    #[arg(long, value_delimiter = ';')]
    names: Vec<String>,

    /// Track numbers to leave out, comma separated (remaining tracks are renumbered)
    #[arg(long, value_delimiter = ',')]
    drop: Vec<u32>,

    /// Leave out segments flagged as short (lead-in or lead-out scraps)
    #[arg(long)]
    drop_short: bool,

    /// Output directory for the extracted tracks
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Config file (defaults to ~/.state/vinylsplit/defaults.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Only show the proposed split
    #[arg(long)]
    dry_run: bool,

    /// Print the proposed split as JSON
    #[arg(long)]
    json: bool,

    /// Write a CUE sheet next to the first source file
    #[arg(long)]
    cue: bool,

    #[arg(long, default_value = "Unknown Artist")]
    artist: String,

    #[arg(long, default_value = "Unknown Album")]
    title: String,

    /// RMS window size in seconds
    #[arg(long)]
    window: Option<f64>,

    /// Boundary search radius around each predicted track end, in seconds
    #[arg(long)]
    search_radius: Option<f64>,

    /// Width of the quiet region searched for, in seconds
    #[arg(long)]
    region: Option<f64>,

    /// Silence threshold as a fraction of the median energy
    #[arg(long)]
    threshold_factor: Option<f64>,

    /// Minimum silence length for the fallback detector, in seconds
    #[arg(long)]
    min_silence: Option<f64>,

    /// Ignore silences this close to the start or end, in seconds
    #[arg(long)]
    margin: Option<f64>,

    /// Median filter kernel size in RMS windows
    #[arg(long)]
    median_kernel: Option<usize>,

    /// Save the analysis options given on the command line as defaults and exit
    #[arg(long)]
    save_defaults: bool,

    /// Show the saved defaults and exit
    #[arg(long)]
    show_saved_defaults: bool,
}

impl Args {
    /// Analysis options given on the command line
    fn cmdline_config(&self) -> Config {
        Config {
            window_sec: self.window,
            search_radius_sec: self.search_radius,
            region_sec: self.region,
            threshold_factor: self.threshold_factor,
            min_silence_sec: self.min_silence,
            margin_sec: self.margin,
            median_kernel: self.median_kernel,
        }
    }
}

fn parse_duration(text: &str) -> Result<Option<f64>, String> {
    let text = text.trim();
    if text.is_empty() || text == "?" {
        return Ok(None);
    }

    let mut seconds = 0.0;
    for part in text.split(':') {
        let value: f64 = part
            .parse()
            .map_err(|_| format!("Invalid duration: {}", text))?;
        seconds = seconds * 60.0 + value;
    }
    Ok(Some(seconds))
}

fn save_defaults(config: &Config, path: Option<&Path>) -> vinylsplit::Result<PathBuf> {
    config.resolve()?;
    match path {
        Some(path) => {
            config.save_to(path)?;
            Ok(path.to_path_buf())
        }
        None => {
            config.save()?;
            Config::get_config_path()
        }
    }
}

/// Apply the user's review choices: drop segments by track number and/or
/// the short ones, then renumber and rename what is left.
fn review_segments(
    segments: Vec<TrackSegment>,
    drop: &[u32],
    drop_short: bool,
    names: &[String],
) -> Vec<TrackSegment> {
    let mut indices: Vec<usize> = segments
        .iter()
        .enumerate()
        .filter(|(_, s)| drop.contains(&s.track_number))
        .map(|(i, _)| i)
        .collect();
    if drop_short {
        indices.extend(find_short_segments(&segments));
    }
    if indices.is_empty() {
        return segments;
    }

    let mut kept = drop_segments(segments, &indices);
    for segment in kept.iter_mut() {
        segment.track_name.clear();
    }
    apply_track_names(&mut kept, names);
    kept
}

fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = seconds % 60.0;
    format!("{:02}:{:05.2}", mins, secs)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let saved_config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if args.show_saved_defaults {
        saved_config.print("Saved defaults");
        return Ok(());
    }

    let mut config = saved_config.clone();
    config.merge(&args.cmdline_config());

    if args.save_defaults {
        let path = save_defaults(&config, args.config.as_deref())?;
        println!("Defaults saved to {:?}", path);
        println!();
        config.print("Saved configuration");
        return Ok(());
    }

    let params = config.resolve()?;

    let mut files = args.files.clone();
    if args.sort {
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    }

    let durations = args
        .durations
        .iter()
        .map(|d| parse_duration(d))
        .collect::<Result<Vec<_>, _>>()?;
    let mut expected = ExpectedTracks::from_durations(durations).with_names(args.names.clone());
    expected.track_count = args.tracks;

    let mut analysis = match analyze_album(&files, &expected, &params) {
        Ok(analysis) => analysis,
        Err(SplitError::SegmentCountMismatch {
            expected,
            found,
            segments,
        }) => {
            eprintln!(
                "Silence detection found {} tracks but {} were expected. Proposed boundaries:",
                found, expected
            );
            for s in &segments {
                eprintln!(
                    "  {:>2}. {} - {}",
                    s.track_number,
                    format_timestamp(s.start),
                    format_timestamp(s.end)
                );
            }
            eprintln!("Pass --durations to use guided detection instead.");
            process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };
    if !args.drop.is_empty() || args.drop_short {
        let segments = std::mem::take(&mut analysis.plan.segments);
        analysis.plan.segments =
            review_segments(segments, &args.drop, args.drop_short, &args.names);
    }
    let plan = &analysis.plan;

    if args.json {
        println!("{}", serde_json::to_string_pretty(plan)?);
    } else {
        println!("Method: {}", plan.method.as_str());
        if !plan.is_reliable() {
            println!("Boundaries come from silence detection only; check them before splitting.");
        }
        let short = find_short_segments(&plan.segments);
        for s in &plan.segments {
            let marker = if short.contains(&(s.track_number as usize - 1)) {
                "  (short)"
            } else if s.spans_files() {
                "  (crosses file boundary, will be truncated)"
            } else {
                ""
            };
            println!(
                "  {:>2}. {:<40} {} - {}  [{}]{}",
                s.track_number,
                s.display_name(),
                format_timestamp(s.start),
                format_timestamp(s.end),
                format_timestamp(s.duration()),
                marker
            );
        }
    }

    if args.cue {
        let cue = generate_cue_sheet(&analysis.timeline, plan, &args.artist, &args.title);
        let path = write_cue_sheet(&files[0], &cue, plan.method)?;
        eprintln!("Wrote {}", path.display());
    }

    if args.dry_run {
        return Ok(());
    }

    let results = extract_segments(&analysis.timeline, &plan.segments, &args.out_dir)?;
    let mut failures = 0;
    for result in results {
        match result {
            Ok(report) if report.is_truncated() => eprintln!(
                "Wrote {} (truncated by {:.2}s at a file boundary)",
                report.output.display(),
                report.truncated_seconds
            ),
            Ok(report) => eprintln!("Wrote {}", report.output.display()),
            Err(e) => {
                eprintln!("Error: {}", e);
                failures += 1;
            }
        }
    }
    if failures > 0 {
        return Err(format!("{} track(s) could not be extracted", failures).into());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("3:45").unwrap(), Some(225.0));
        assert_eq!(parse_duration("1:02:03").unwrap(), Some(3723.0));
        assert_eq!(parse_duration("245.5").unwrap(), Some(245.5));
        assert_eq!(parse_duration("?").unwrap(), None);
        assert!(parse_duration("3m45").is_err());
    }

    fn segment(number: u32, start: f64, end: f64, name: &str) -> TrackSegment {
        TrackSegment {
            source_files: vec![PathBuf::from("side_a.wav")],
            start,
            end,
            track_number: number,
            track_name: name.to_string(),
        }
    }

    #[test]
    fn test_review_drops_short_scrap_and_renames() {
        let segments = vec![
            segment(1, 0.0, 4.0, "Intro"),
            segment(2, 4.0, 200.0, "Song A"),
            segment(3, 200.0, 410.0, "Song B"),
            segment(4, 410.0, 600.0, ""),
        ];
        let names = vec!["Song A".to_string(), "Song B".to_string(), "Song C".to_string()];

        let kept = review_segments(segments.clone(), &[], true, &names);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].start, 4.0);
        assert_eq!(kept[0].track_number, 1);
        assert_eq!(kept[2].track_name, "Song C");

        let kept = review_segments(segments.clone(), &[3], false, &[]);
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[2].start, 410.0);
        assert_eq!(kept[2].track_number, 3);
        assert_eq!(kept[1].track_name, "");

        assert_eq!(review_segments(segments.clone(), &[], false, &names), segments);
    }

    #[test]
    fn test_save_defaults_merges_cmdline_options() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("defaults.toml");
        Config {
            margin_sec: Some(2.0),
            ..Config::default()
        }
        .save_to(&path)
        .unwrap();

        let args = Args::parse_from([
            "split_album",
            "--config",
            path.to_str().unwrap(),
            "--search-radius",
            "8",
            "--save-defaults",
        ]);
        let mut config = Config::load_from(&path).unwrap();
        config.merge(&args.cmdline_config());
        assert_eq!(save_defaults(&config, args.config.as_deref()).unwrap(), path);

        let saved = Config::load_from(&path).unwrap();
        assert_eq!(saved.margin_sec, Some(2.0));
        assert_eq!(saved.search_radius_sec, Some(8.0));
        assert!(saved.window_sec.is_none());

        let bad = Config {
            window_sec: Some(-1.0),
            ..Config::default()
        };
        assert!(save_defaults(&bad, Some(&path)).is_err());
        assert_eq!(Config::load_from(&path).unwrap(), saved);
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from([
            "split_album",
            "--durations",
            "3:00,?,2:30",
            "--names",
            "A;B;C",
            "--dry-run",
            "side_a.wav",
            "side_b.wav",
        ]);
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.durations, vec!["3:00", "?", "2:30"]);
        assert_eq!(args.names, vec!["A", "B", "C"]);
        assert!(args.dry_run);
        assert_eq!(args.cmdline_config(), Config::new());

        let args = Args::parse_from(["split_album", "--drop", "1,4", "--drop-short", "side_a.wav"]);
        assert_eq!(args.drop, vec![1, 4]);
        assert!(args.drop_short);
    }

    #[test]
    fn test_files_optional_only_for_defaults_commands() {
        assert!(Args::try_parse_from(["split_album"]).is_err());
        let args = Args::try_parse_from(["split_album", "--show-saved-defaults"]).unwrap();
        assert!(args.files.is_empty());
        let args =
            Args::try_parse_from(["split_album", "--window", "0.02", "--save-defaults"]).unwrap();
        assert_eq!(args.cmdline_config().window_sec, Some(0.02));
    }
}

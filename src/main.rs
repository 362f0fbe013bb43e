use anyhow::Result;
use setl::{split_list, StackETL};
use std::path::PathBuf;

const DATA_ROOT: &str = "../UnzippedFiles";
const OUT_ROOT: &str = "../csv_files";
const PLATFORM_LIST: &str = "stackexchange_download_links.csv";

// The stackoverflow dump does not fit in memory as a whole document.
const DEFAULT_SKIP: &[&str] = &["stackoverflow"];

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string())
}

fn main() -> Result<()> {
    setl::init_tracing_once();

    let data_dir = PathBuf::from(env_or("SETL_DATA_DIR", DATA_ROOT));
    let out_dir = PathBuf::from(env_or("SETL_OUT_DIR", OUT_ROOT));
    let list = PathBuf::from(env_or("SETL_PLATFORMS", PLATFORM_LIST));

    let mut skip: Vec<String> = DEFAULT_SKIP.iter().map(|s| s.to_string()).collect();
    if let Ok(s) = std::env::var("SETL_SKIP_PLATFORMS") {
        skip.extend(split_list(&s));
    }

    let hw = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4);

    let mut etl = StackETL::new()
        .data_dir(&data_dir)
        .out_dir(&out_dir)
        .skip_platforms(&skip)
        .parallelism(hw)
        .platform_concurrency(2)
        .progress(true);
    if let Ok(fill) = std::env::var("SETL_FILL_VALUE") {
        etl = etl.fill_value(fill);
    }

    // Explicit platform names on the command line win over the list file.
    let args: Vec<String> = std::env::args().skip(1).collect();
    let report = if !args.is_empty() {
        etl.run_platforms(&args)?
    } else if list.is_file() {
        etl.run_platform_list(&list)?
    } else {
        tracing::info!("{} not found; processing every dump under {}", list.display(), data_dir.display());
        etl.run_discovered()?
    };

    println!(
        "Wrote {} platform CSVs ({} skipped, {} failed)",
        report.written, report.skipped, report.failed
    );
    for outcome in &report.platforms {
        if let setl::PlatformOutcome::Failed { platform, error } = outcome {
            eprintln!("Error: {platform}: {error}");
        }
    }
    Ok(())
}

use clap::{Arg, Command};
use leadspark::config::Settings;
use leadspark::finder::FinderRequest;
use leadspark::provider::VerificationStatus;
use leadspark::store::{log_to_csv, ResultStore};
use leadspark::{run_finder, run_verifier, VerificationClient};
use log::LevelFilter;
use std::io::Read;
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("leadspark")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lead-generation email finder and verifier")
        .long_about(
            "LeadSpark - guess likely email addresses for people at a domain and\n\
             verify address lists against an email validation API:\n\
             • Pattern-based candidate generation (first.last, flast, ...)\n\
             • Chunked concurrent verification with progress reporting\n\
             • Catch-all domain detection to suppress false positives\n\
             • Local history of every verification with CSV export",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Settings file path")
                .default_value("leadspark.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default settings file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the settings file and show the effective configuration")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("find")
                .long("find")
                .value_name("DOMAIN")
                .help("Guess and verify addresses for the names in --names at this domain")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("names")
                .long("names")
                .value_name("FILE")
                .help("Newline-separated full names for --find ('-' reads stdin)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("verify")
                .long("verify")
                .value_name("FILE")
                .help("Verify every email found in this file ('-' reads stdin)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-api")
                .long("test-api")
                .value_name("EMAIL")
                .help("Send one probe call and print the mapped outcome and raw response")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .help("Show the verification log, newest first")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("limit")
                .long("limit")
                .value_name("N")
                .help("Row limit for --log and --valid")
                .default_value("50"),
        )
        .arg(
            Arg::new("status")
                .long("status")
                .value_name("STATUS")
                .help("Filter --log by status (Valid, Invalid, Risky, Unknown)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("export-csv")
                .long("export-csv")
                .value_name("FILE")
                .help("Write the full verification log as CSV")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("clear-log")
                .long("clear-log")
                .help("Clear the verification log and stored valid addresses")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("stats")
                .long("stats")
                .help("Show verification counters")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("valid")
                .long("valid")
                .help("List stored valid addresses")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("by-domain")
                .long("by-domain")
                .help("Group --valid output by domain")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match Settings::default().to_file(generate_path) {
            Ok(()) => {
                println!("✅ Default settings written to: {generate_path}");
                println!("Edit the file to set your API provider and key.");
            }
            Err(e) => {
                eprintln!("Error generating settings file: {e}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let settings = match load_settings(config_path) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error loading settings: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        println!("🔍 Settings from {config_path}:");
        println!("  Provider: {:?}", settings.api_provider);
        println!("  Endpoint: {}", settings.endpoint());
        println!(
            "  API key: {}",
            if settings.api_key.is_empty() { "(none)" } else { "(set)" }
        );
        println!("  Parallel requests: {}", settings.effective_parallelism());
        println!("  Enabled patterns: {}", settings.email_patterns.len());
        println!("  Database: {}", settings.database_path);
        println!("✅ Settings are valid");
        return;
    }

    let limit: usize = match matches.get_one::<String>("limit").unwrap().parse() {
        Ok(limit) => limit,
        Err(_) => {
            eprintln!("Error: --limit must be a non-negative integer");
            process::exit(1);
        }
    };

    let result = if let Some(domain) = matches.get_one::<String>("find") {
        let names_path = matches.get_one::<String>("names");
        cmd_find(&settings, domain, names_path.map(String::as_str)).await
    } else if let Some(input_path) = matches.get_one::<String>("verify") {
        cmd_verify(&settings, input_path).await
    } else if let Some(email) = matches.get_one::<String>("test-api") {
        cmd_test_api(&settings, email).await
    } else if matches.get_flag("log") {
        let status = matches.get_one::<String>("status");
        cmd_log(&settings, limit, status.map(String::as_str))
    } else if let Some(csv_path) = matches.get_one::<String>("export-csv") {
        cmd_export_csv(&settings, csv_path)
    } else if matches.get_flag("clear-log") {
        cmd_clear(&settings)
    } else if matches.get_flag("stats") {
        cmd_stats(&settings)
    } else if matches.get_flag("valid") {
        cmd_valid(&settings, limit, matches.get_flag("by-domain"))
    } else {
        eprintln!("No command given; try --find, --verify, --log, --stats or --help");
        process::exit(1);
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn load_settings(path: &str) -> anyhow::Result<Settings> {
    if std::path::Path::new(path).exists() {
        Settings::from_file(path)
    } else {
        log::debug!("No settings file at {path}, using defaults");
        Ok(Settings::default())
    }
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

fn print_progress(processed: usize, total: usize, what: &str) {
    println!("  Processed {processed} of {total} {what}...");
}

async fn cmd_find(settings: &Settings, domain: &str, names_path: Option<&str>) -> anyhow::Result<()> {
    let names_path =
        names_path.ok_or_else(|| anyhow::anyhow!("--find requires --names FILE (or '-')"))?;
    let names: Vec<String> = read_input(names_path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect();

    let store = ResultStore::open(&settings.database_path)?;
    let request = FinderRequest {
        domain: domain.to_string(),
        names,
    };

    println!(
        "Generating & checking candidates for {} name(s) at {}...",
        request.names.len(),
        domain
    );
    let report = run_finder(settings, Some(&store), &request, |p| {
        print_progress(p.processed, p.total, "candidates")
    })
    .await?;

    println!();
    for result in &report.results {
        if result.valid_emails.is_empty() {
            println!("  {:<30} (none found)", result.name);
        } else {
            println!("  {:<30} {}", result.name, result.valid_emails.join(", "));
        }
    }
    println!();
    println!(
        "Checked {} unique candidate(s); {} valid address(es) found.",
        report.total_candidates,
        report.all_valid.len()
    );

    if let Some(flag) = &report.catch_all {
        println!("⚠️  Likely catch-all domain: {}", flag.reason);
        println!("   Results were NOT saved; treat these addresses as unverified.");
    } else if report.persisted {
        println!("✅ Results saved to {}", settings.database_path);
    }

    Ok(())
}

async fn cmd_verify(settings: &Settings, input_path: &str) -> anyhow::Result<()> {
    let text = read_input(input_path)?;
    let store = ResultStore::open(&settings.database_path)?;

    let report = run_verifier(settings, Some(&store), &text, |p| {
        print_progress(p.processed, p.total, "emails")
    })
    .await?;

    println!();
    println!("{:<35} {:<8} DETAIL", "EMAIL", "STATUS");
    for outcome in &report.outcomes {
        println!(
            "{:<35} {:<8} {}",
            outcome.address, outcome.status, outcome.detail
        );
    }
    println!();
    println!(
        "{} verified: {} valid ({} newly stored).",
        report.outcomes.len(),
        report.valid.len(),
        report.newly_stored
    );

    Ok(())
}

async fn cmd_test_api(settings: &Settings, email: &str) -> anyhow::Result<()> {
    println!("Probing {:?} with {email}...", settings.api_provider);
    let client = VerificationClient::new(settings)?;
    let (outcome, payload) = client.verify_detailed(email).await?;

    println!();
    println!("Status: {}", outcome.status);
    println!("Detail: {}", outcome.detail);
    match payload {
        Some(payload) => {
            println!("Raw response:");
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        None => println!("No response body received."),
    }

    Ok(())
}

fn cmd_log(settings: &Settings, limit: usize, status: Option<&str>) -> anyhow::Result<()> {
    let status = match status {
        Some(s) => Some(s.parse::<VerificationStatus>()?),
        None => None,
    };

    let store = ResultStore::open(&settings.database_path)?;
    let entries = store.recent_log(limit, status)?;
    if entries.is_empty() {
        println!("The verification log is empty.");
        return Ok(());
    }

    println!(
        "{:<35} {:<8} {:<10} {:<17} DETAIL",
        "EMAIL", "STATUS", "SOURCE", "WHEN"
    );
    for entry in &entries {
        let when = entry.timestamp.format("%Y-%m-%d %H:%M").to_string();
        println!(
            "{:<35} {:<8} {:<10} {:<17} {}",
            entry.email, entry.status, entry.source, when, entry.detail
        );
    }
    println!();
    println!("Showing {} record(s).", entries.len());

    Ok(())
}

fn cmd_export_csv(settings: &Settings, csv_path: &str) -> anyhow::Result<()> {
    let store = ResultStore::open(&settings.database_path)?;
    let entries = store.recent_log(usize::MAX, None)?;
    std::fs::write(csv_path, log_to_csv(&entries))?;
    println!("✅ Exported {} record(s) to {csv_path}", entries.len());
    Ok(())
}

fn cmd_clear(settings: &Settings) -> anyhow::Result<()> {
    let store = ResultStore::open(&settings.database_path)?;
    store.clear()?;
    println!("✅ Verification log and stored valid addresses cleared.");
    Ok(())
}

fn cmd_stats(settings: &Settings) -> anyhow::Result<()> {
    let store = ResultStore::open(&settings.database_path)?;
    let stats = store.stats()?;

    println!("📊 Verification statistics");
    println!("═══════════════════════════");
    println!("  Total verified:      {}", stats.total_verified);
    println!("  Valid results:       {}", stats.valid);
    println!("  Risky results:       {}", stats.risky);
    println!("  Stored valid emails: {}", stats.stored_valid);

    Ok(())
}

fn cmd_valid(settings: &Settings, limit: usize, by_domain: bool) -> anyhow::Result<()> {
    let store = ResultStore::open(&settings.database_path)?;

    if by_domain {
        let buckets = store.valid_by_domain()?;
        if buckets.is_empty() {
            println!("No valid addresses stored yet.");
            return Ok(());
        }
        for (domain, emails) in &buckets {
            println!("{domain} ({})", emails.len());
            for email in emails {
                println!("  {email}");
            }
        }
    } else {
        let emails = store.valid_emails(limit)?;
        if emails.is_empty() {
            println!("No valid addresses stored yet.");
            return Ok(());
        }
        for entry in &emails {
            println!("{}", entry.email);
        }
        println!();
        println!("Showing {} address(es).", emails.len());
    }

    Ok(())
}

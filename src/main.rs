use clap::Parser;
use ocrdex::{
    Config,
    Store,
    cli::{self, Cli, Command},
    error,
    indexer::{self, IndexOptions},
    search,
    since,
};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("OCRDEX_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Command::Completions(args) = &cli.command {
        args.generate();
        return Ok(());
    }

    let config = Config::load(
        cli.data_dir.as_deref(),
        &cli.languages,
        cli.tesseract.as_deref(),
    )?;

    match cli.command {
        Command::Index(args) => cmd_index(&config, &args, cli.quiet)?,
        Command::Search(args) => cmd_search(&config, &args)?,
        Command::Show(args) => cmd_show(&config, &args)?,
        Command::Status(args) => cmd_status(&config, args.json)?,
        Command::Completions(_) => {}
    }

    Ok(())
}

fn cmd_index(
    config: &Config,
    args: &cli::IndexArgs,
    quiet: bool,
) -> error::Result<()> {
    // Bad --since or language codes must fail before anything is scanned.
    let since = since::parse_since(args.since.as_deref())?;
    let languages = config.languages()?;
    let store = Store::open(&config.data_dir.images_db())?;
    let mut recognizer = config.recognizer();

    let options = IndexOptions {
        languages,
        since,
        show_progress: !args.no_progress && !quiet,
    };

    let report = indexer::index_directory(
        &store,
        &mut recognizer,
        &args.directory,
        &options,
    )?;

    if !quiet {
        eprintln!(
            "Indexed {} new image(s), {} already indexed, {} failed \
             ({} found, {} older than cutoff)",
            report.indexed,
            report.skipped,
            report.failed.len(),
            report.discovered,
            report.filtered_out,
        );
    }
    Ok(())
}

fn cmd_search(config: &Config, args: &cli::SearchArgs) -> error::Result<()> {
    let store = Store::open(&config.data_dir.images_db())?;
    let paths = search::execute_search(&store, &args.query)?;

    if args.json {
        println!("{}", search::render_json(&args.query, &paths)?);
    } else {
        print!("{}", search::render_human(&paths));
    }
    Ok(())
}

fn cmd_show(config: &Config, args: &cli::ShowArgs) -> error::Result<()> {
    let store = Store::open(&config.data_dir.images_db())?;

    // Records are keyed by canonical path; fall back to the literal
    // argument for files that have since been moved or deleted.
    let key = args
        .path
        .canonicalize()
        .unwrap_or_else(|_| args.path.clone())
        .to_string_lossy()
        .into_owned();

    let content = store.get(&key)?.ok_or_else(|| error::Error::NotFound {
        kind: "image",
        name: key.clone(),
    })?;
    println!("{content}");
    Ok(())
}

fn cmd_status(config: &Config, json: bool) -> error::Result<()> {
    let store = Store::open(&config.data_dir.images_db())?;
    let images = store.count()?;
    let recognizer = config.recognizer();
    let languages = config.languages().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "ignoring invalid OCR language setting");
        Vec::new()
    });

    if json {
        let status = serde_json::json!({
            "data_dir": config.data_dir.root().display().to_string(),
            "languages": languages,
            "tesseract": recognizer.binary().display().to_string(),
            "images": images,
        });
        println!("{status}");
    } else {
        println!("Data directory: {}", config.data_dir.root().display());
        println!("Languages: {}", languages.join("+"));
        println!("Tesseract: {}", recognizer.binary().display());
        println!("Images: {images}");
    }
    Ok(())
}

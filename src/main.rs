use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::info;

use quali_predictor::{
    AppConfig, DashboardSession, ModelStore, PredictorError, Selection,
    dashboard::{self, SharedProvider},
    ui::PredictorApp,
    writer,
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Directory for cached provider responses
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Base URL of the Ergast-compatible API
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the prediction dashboard
    Dashboard,
    /// Train, predict and print the results
    Predict {
        #[arg(short, long, default_value_t = 2025)]
        season: u32,

        #[arg(short, long, default_value = "Suzuka")]
        circuit: String,

        /// Also write the predictions as JSON lines
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Train the model and print its metrics
    Train,
    /// Delete cached provider responses
    ClearCache,
}

fn load_config(args: &Args) -> Result<AppConfig, PredictorError> {
    let mut config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(cache_dir) = &args.cache_dir {
        config.cache_dir = cache_dir.clone();
    }
    if let Some(api_url) = &args.api_url {
        config.api_base_url = api_url.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run_dashboard(config: AppConfig) -> Result<(), PredictorError> {
    let provider: SharedProvider = Arc::new(config.build_provider()?);
    let session = DashboardSession::new(provider, Arc::new(ModelStore::new()), &config);

    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_title(dashboard::WINDOW_TITLE)
        .with_inner_size(Vec2::new(1100., 700.));

    eframe::run_native(
        dashboard::WINDOW_TITLE,
        native_options,
        Box::new(|cc| Ok(Box::new(PredictorApp::new(session, config, cc)))),
    )
    .expect("could not start app");
    Ok(())
}

fn predict(
    config: &AppConfig,
    season: u32,
    circuit: &str,
    output: Option<&PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let selection = Selection {
        season,
        circuit: circuit.parse()?,
    };
    let provider = config.build_provider()?;
    let model = dashboard::build_model(&provider, &config.training_request())?;
    let report = dashboard::run_prediction(&provider, &model, &selection, config.recent_rounds)
        .map_err(|e| e.user_message())?;

    println!("{}", report.title);
    println!("{:<8} {:<24} {:>12}", "Driver", "Team", "Q3 Time (s)");
    for [driver, team, time] in report.table_rows() {
        println!("{:<8} {:<24} {:>12}", driver, team, time);
    }
    println!();
    println!("{}", report.mae_line);
    println!("{}", report.r2_line);

    if let Some(output) = output {
        writer::write_predictions(output, &report.rows)?;
    }
    Ok(())
}

fn train(config: &AppConfig) -> Result<(), PredictorError> {
    let provider = config.build_provider()?;
    let model = dashboard::build_model(&provider, &config.training_request())?;
    println!(
        "Trained on {} rows, evaluated on {} held-out rows",
        model.train_rows, model.test_rows
    );
    println!("{}", dashboard::mae_line(&model));
    println!("{}", dashboard::r2_line(&model));
    Ok(())
}

fn clear_cache(config: &AppConfig) -> Result<(), PredictorError> {
    let removed = config.response_cache()?.clear()?;
    info!("Removed {} cached responses from {:?}", removed, config.cache_dir);
    println!("Removed {} cached responses", removed);
    Ok(())
}

fn main() {
    #[cfg(debug_assertions)]
    colog::init();

    let cli = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    let config = load_config(&cli).expect("Invalid configuration");
    match &cli.command {
        Commands::Dashboard => {
            run_dashboard(config).expect("Error while running the dashboard");
        }
        Commands::Predict {
            season,
            circuit,
            output,
        } => {
            if let Err(e) = predict(&config, *season, circuit, output.as_ref()) {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        Commands::Train => train(&config).expect("Error while training the model"),
        Commands::ClearCache => clear_cache(&config).expect("Error while clearing the cache"),
    };
}

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use gravity_formula::calibration::gravity_temperature_correction_c;
use gravity_formula::error::ErrorCode;
use gravity_formula::{
    CalibrationPointSet, CalibrationService, FitReport, FormulaConfig, FormulaError,
    JsonFileStore, UnitModel,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "formula_cli",
    about = "Create and evaluate tilt-to-gravity calibration formulas"
)]
struct Cli {
    /// Configuration file (defaults to formula_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the formula state file from the configuration
    #[arg(long)]
    state: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fit a formula to calibration points and store it when accepted
    Fit {
        /// JSON array of {"a": angle, "g": gravity} entries (max 10)
        #[arg(long)]
        points: PathBuf,
        /// Unit of the gravity values
        #[arg(long, value_enum)]
        unit: Option<UnitArg>,
        /// Maximum deviation in SG gravity points (finite, not negative)
        #[arg(long)]
        max_deviation: Option<f64>,
    },
    /// Print the stored formula and last error as JSON
    Show,
    /// Convert a tilt angle to gravity with the stored formula
    Gravity {
        #[arg(long, allow_hyphen_values = true)]
        angle: f64,
        /// Apply temperature correction for a reading taken at this temperature (°C)
        #[arg(long, allow_hyphen_values = true)]
        temp: Option<f64>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum UnitArg {
    Sg,
    Plato,
}

impl From<UnitArg> for UnitModel {
    fn from(arg: UnitArg) -> Self {
        match arg {
            UnitArg::Sg => UnitModel::SpecificGravity,
            UnitArg::Plato => UnitModel::Plato,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => FormulaConfig::load_from_file(path),
        None => FormulaConfig::load(),
    };
    if let Some(state) = cli.state {
        config.state_path = state;
    }
    tracing::debug!(
        command = ?cli.command,
        state_path = %config.state_path.display(),
        "formula_cli starting"
    );

    let service = CalibrationService::with_store(Box::new(JsonFileStore::new(
        &config.state_path,
    )))
    .with_context(|| format!("loading {}", config.state_path.display()))?;

    match cli.command {
        Commands::Fit {
            points,
            unit,
            max_deviation,
        } => {
            if let Some(unit) = unit {
                config.gravity_unit = unit.into();
            }
            if let Some(max_deviation) = max_deviation {
                config.max_deviation = max_deviation;
            }
            run_fit(&service, &config, &points)
        }
        Commands::Show => run_show(&service),
        Commands::Gravity { angle, temp } => run_gravity(&service, &config, angle, temp),
    }
}

fn load_points(path: &Path) -> Result<CalibrationPointSet> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

fn run_fit(service: &CalibrationService, config: &FormulaConfig, path: &Path) -> Result<ExitCode> {
    let points = load_points(path)?;
    let result = service.compute_formula_with_config(&points, config);
    let report = CalibrationService::preview(&points, config.gravity_unit).ok();

    let (formula, code) = match result {
        Ok(formula) => (formula, None),
        Err(err) if err.is_calibration_error() => (service.current_formula()?, Some(err.code())),
        Err(err) => return Err(anyhow::Error::new(err).context("computing formula")),
    };
    let last_error = service.last_error()?;

    let payload = FitPayload {
        accepted: code.is_none(),
        formula: &formula,
        error: &last_error,
        error_code: code,
        unit: config.gravity_unit,
        max_deviation: config.max_deviation,
        report: report.as_ref(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    Ok(if payload.accepted {
        ExitCode::from(0)
    } else {
        ExitCode::from(2)
    })
}

fn run_show(service: &CalibrationService) -> Result<ExitCode> {
    let state = service.get_state().map_err(stored_state_error)?;
    println!("{}", serde_json::to_string_pretty(&state)?);
    Ok(ExitCode::from(0))
}

fn run_gravity(
    service: &CalibrationService,
    config: &FormulaConfig,
    angle: f64,
    temp: Option<f64>,
) -> Result<ExitCode> {
    let Some(sg) = service.gravity_at(angle).map_err(stored_state_error)? else {
        eprintln!("No usable formula stored in {}", config.state_path.display());
        return Ok(ExitCode::from(2));
    };

    // The formula yields SG; report in the configured unit
    let unit = config.gravity_unit;
    let corrected = temp.map(|temp_c| {
        unit.from_sg(gravity_temperature_correction_c(
            sg,
            temp_c,
            config.calibration_temp_c,
        ))
    });

    let payload = GravityPayload {
        angle,
        gravity: unit.from_sg(sg),
        corrected,
        unit,
    };
    println!("{}", serde_json::to_string(&payload)?);
    Ok(ExitCode::from(0))
}

fn stored_state_error(err: FormulaError) -> anyhow::Error {
    anyhow::Error::new(err).context("reading stored formula state")
}

#[derive(Serialize)]
struct FitPayload<'a> {
    accepted: bool,
    formula: &'a str,
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<i32>,
    unit: UnitModel,
    max_deviation: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a FitReport>,
}

#[derive(Serialize)]
struct GravityPayload {
    angle: f64,
    gravity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    corrected: Option<f64>,
    unit: UnitModel,
}

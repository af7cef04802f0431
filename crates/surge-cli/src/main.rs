//! `surge` - convert wind footprints to storm surge and fit landfall decay.
//!
//! All inputs and outputs are JSON files. Log verbosity follows `RUST_LOG`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use surge_core::elevation::SuppliedElevation;
use surge_core::heightfield::HeightField;
use surge_core::landfall::resample::{KeepLandFlags, LandAnnotator, LinearResampler};
use surge_core::landfall::track::Track;
use surge_core::storage::{is_no_save, load_json, save_json};
use surge_core::{
    attach_elevation, fit_landfall_decay, generate_surge, DecayFitParams, ElevationProviders, ElevationRequest,
    ElevationSource, HazardFootprintSet, RunSettings, SurgeParams,
};

#[derive(Parser, Debug)]
#[command(name = "surge", about = "Storm surge footprints from tropical cyclone wind")]
struct Cli {
    /// JSON file with `run`, `surge` and `decay` sections; missing fields
    /// take their defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a wind footprint into a surge footprint.
    Convert {
        /// Wind hazard footprint (JSON).
        hazard: PathBuf,

        /// Output file. `none` or `None` skips saving.
        #[arg(short, long, default_value = "none")]
        output: String,

        /// Fetch elevation from this source even if the hazard carries some.
        #[arg(long, value_enum)]
        source: Option<SourceArg>,

        /// Per-location elevation computed elsewhere (JSON `{ids, elevation}`).
        #[arg(long)]
        supplied: Option<PathBuf>,

        /// Coarse elevation raster (HeightField JSON).
        #[arg(long)]
        coarse_dem: Option<PathBuf>,

        /// Fine elevation raster (HeightField JSON).
        #[arg(long)]
        fine_dem: Option<PathBuf>,

        /// Elevation cache key. Defaults to the hazard file stem; `none`
        /// disables the cache.
        #[arg(long)]
        cache_key: Option<String>,

        /// Sea level rise increment (m), overriding the config file.
        #[arg(long)]
        slr: Option<f64>,

        /// Run the fine-elevation loop in parallel.
        #[arg(long)]
        parallel: bool,
    },
    /// Fit post-landfall pressure decay per wind category.
    FitDecay {
        /// Track set (JSON array of tracks).
        tracks: PathBuf,

        /// Output file for the fitted table. `none` or `None` skips saving.
        #[arg(short, long, default_value = "none")]
        output: String,

        /// Raster used to flag points on land; without it the tracks' own
        /// flags are used.
        #[arg(long)]
        land_dem: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Coarse,
    Fine,
}

impl From<SourceArg> for ElevationSource {
    fn from(s: SourceArg) -> Self {
        match s {
            SourceArg::Coarse => ElevationSource::Coarse,
            SourceArg::Fine => ElevationSource::Fine,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    run: RunSettings,
    surge: SurgeParams,
    decay: DecayFitParams,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config: ConfigFile = match &cli.config {
        Some(path) => read(path)?,
        None => ConfigFile::default(),
    };

    match cli.command {
        Command::Convert {
            hazard,
            output,
            source,
            supplied,
            coarse_dem,
            fine_dem,
            cache_key,
            slr,
            parallel,
        } => {
            let mut settings = config.run;
            settings.parallel |= parallel;
            let mut params = config.surge;
            if let Some(slr) = slr {
                params.slr_increment_m = slr;
            }
            let source = source.map(ElevationSource::from);
            if source == Some(ElevationSource::Fine) && fine_dem.is_none() {
                bail!("--source fine needs --fine-dem");
            }

            let mut footprint: HazardFootprintSet = read(&hazard)?;
            let supplied: Option<SuppliedElevation> = supplied.as_deref().map(read).transpose()?;
            let coarse: Option<HeightField> = coarse_dem.as_deref().map(read).transpose()?;
            let fine: Option<HeightField> = fine_dem.as_deref().map(read).transpose()?;
            let cache_key = cache_key.unwrap_or_else(|| file_stem(&hazard));

            let mut providers = ElevationProviders::default();
            if let Some(hf) = &coarse {
                providers.coarse = Some(hf);
            }
            if let Some(hf) = &fine {
                providers.fine = Some(hf);
            }
            let request = ElevationRequest {
                source_override: source,
                supplied: supplied.as_ref(),
                cache_key: &cache_key,
            };

            let elevation = attach_elevation(&mut footprint, &request, &providers, &settings)
                .context("attaching elevation; no surge footprint produced")?;
            let summary = generate_surge(&mut footprint, &elevation, &params, &settings)?;

            write(&output, &footprint)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::FitDecay { tracks, output, land_dem } => {
            let tracks: Vec<Track> = read(&tracks)?;
            let land: Option<HeightField> = land_dem.as_deref().map(read).transpose()?;
            let annotator: &dyn LandAnnotator = match &land {
                Some(hf) => hf,
                None => &KeepLandFlags,
            };

            let fit = fit_landfall_decay(&tracks, &config.decay, &LinearResampler, annotator)?;

            write(&output, &fit)?;
            println!("{}", serde_json::to_string_pretty(&fit)?);
        }
    }

    Ok(())
}

fn read<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    load_json(path).with_context(|| format!("reading {}", path.display()))
}

fn write<T: Serialize>(name: &str, value: &T) -> Result<()> {
    if is_no_save(name) {
        info!("output not saved");
        return Ok(());
    }
    let path = Path::new(name);
    save_json(path, value).with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), "saved");
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "hazard".into())
}

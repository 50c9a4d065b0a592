use std::fs;
use std::path::PathBuf;
use std::process;

use clap::Parser;

use faceatlas_core::clustering::domain::cluster_engine::ClusterParams;
use faceatlas_core::clustering::domain::distance_metric::DistanceWeights;
use faceatlas_core::detection::domain::thumbnail_extractor::NullThumbnailExtractor;
use faceatlas_core::pipeline::recluster_use_case::ReclusterUseCase;
use faceatlas_core::shared::person::Person;
use faceatlas_core::shared::photo::Photo;
use faceatlas_core::storage::domain::identity_store::IdentityStore;
use faceatlas_core::storage::infrastructure::json_identity_store::JsonIdentityStore;
use faceatlas_core::storage::infrastructure::memory_identity_store::MemoryIdentityStore;

/// Face identity clustering over captured detector output.
#[derive(Parser)]
#[command(name = "faceatlas")]
struct Cli {
    /// JSON file holding an array of photos with their detected faces.
    input: PathBuf,

    /// Merge threshold; raising it merges more aggressively.
    #[arg(long, default_value = "0.65")]
    threshold: f64,

    /// Weight of the embedding distance term.
    #[arg(long, default_value = "0.60")]
    embedding_weight: f64,

    /// Weight of the landmark proportion term.
    #[arg(long, default_value = "0.20")]
    landmark_weight: f64,

    /// Weight of the skin tone term.
    #[arg(long, default_value = "0.15")]
    skin_tone_weight: f64,

    /// Weight of the bounding-box shape term.
    #[arg(long, default_value = "0.05")]
    shape_weight: f64,

    /// Persist people to this JSON store; names assigned in earlier runs
    /// carry forward.
    #[arg(long)]
    store: Option<PathBuf>,

    /// Write the resolved people to this file as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let photos: Vec<Photo> = serde_json::from_slice(&fs::read(&cli.input)?)?;
    log::info!(
        "loaded {} photo(s), {} face(s)",
        photos.len(),
        photos.iter().map(|p| p.faces.len()).sum::<usize>()
    );

    let mut store = build_store(&cli, &photos)?;
    let params = ClusterParams {
        threshold: cli.threshold,
        weights: DistanceWeights {
            embedding: cli.embedding_weight,
            landmarks: cli.landmark_weight,
            skin_tone: cli.skin_tone_weight,
            shape: cli.shape_weight,
        },
    };

    let mut thumbnailer = NullThumbnailExtractor;
    let persons = ReclusterUseCase::new(store.as_mut(), &mut thumbnailer, params).execute(1)?;

    print_people(&persons);

    if let Some(path) = &cli.output {
        fs::write(path, serde_json::to_vec_pretty(&persons)?)?;
        log::info!("wrote {} person(s) to {}", persons.len(), path.display());
    }

    Ok(())
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.threshold < 0.0 {
        return Err("threshold must be >= 0".into());
    }
    let weights = [
        cli.embedding_weight,
        cli.landmark_weight,
        cli.skin_tone_weight,
        cli.shape_weight,
    ];
    if weights.iter().any(|w| *w < 0.0) {
        return Err("weights must be >= 0".into());
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > 1e-6 {
        return Err(format!("weights must sum to 1.0 (got {sum})").into());
    }
    Ok(())
}

fn build_store(
    cli: &Cli,
    photos: &[Photo],
) -> Result<Box<dyn IdentityStore>, Box<dyn std::error::Error>> {
    let mut store: Box<dyn IdentityStore> = match &cli.store {
        Some(path) => Box::new(JsonIdentityStore::open(path)?),
        None => Box::new(MemoryIdentityStore::new()),
    };
    for photo in photos {
        store.save_photo(photo)?;
    }
    Ok(store)
}

fn print_people(persons: &[Person]) {
    if persons.is_empty() {
        println!("No people found.");
        return;
    }
    println!("{} people:", persons.len());
    for person in persons {
        println!(
            "  {:<20}  photos {:>3}  faces {:>3}  quality {:.2}",
            person.name,
            person.photo_count,
            person.face_ids.len(),
            person.quality_score
        );
    }
}

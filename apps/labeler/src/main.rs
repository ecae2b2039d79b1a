use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use labeler::config::{Config, JobSchema};
use labeler::ground_truth::{
    AtsGroundTruthGenerator, DataLoadOptions, GenerationOptions, KeywordScoreEngine,
};
use labeler::loaders::{DatasetSource, JobDescriptionLoader, JobRowMapping, ResumeLoader};
use labeler::registry::{DatasetRegistry, ReqwestTransport, ResilientFetchClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting labeler v{}", env!("CARGO_PKG_VERSION"));

    // Registry client (retry/timeout policy lives here)
    let transport = Arc::new(ReqwestTransport::new()?);
    let registry: Arc<dyn DatasetRegistry> = Arc::new(ResilientFetchClient::new(
        transport,
        config.registry_base_url.clone(),
        config.registry_token.clone(),
        config.fetch_options(),
    ));
    info!(
        "Registry client initialized ({}, {} attempts, {}ms timeout)",
        config.registry_base_url,
        config.fetch_options().max_attempts,
        config.fetch_timeout.as_millis()
    );

    for (dataset, subset, split) in [
        (&config.resume_dataset, &config.resume_subset, &config.resume_split),
        (&config.jd_dataset, &config.jd_subset, &config.jd_split),
    ] {
        match registry.dataset_info(dataset, subset, split).await {
            Ok(info) => info!(dataset = %info.dataset, rows = ?info.num_rows, "dataset available"),
            Err(e) => warn!(dataset = %dataset, error = %e, "dataset info unavailable"),
        }
    }

    let resume_loader = ResumeLoader::new(
        registry.clone(),
        DatasetSource::new(&config.resume_dataset)
            .with_subset(&config.resume_subset)
            .with_split(&config.resume_split),
    );
    let mapping = match config.jd_schema {
        JobSchema::Postings => JobRowMapping::postings(),
        JobSchema::Classification => JobRowMapping::classification(),
    };
    let job_loader = JobDescriptionLoader::new(
        registry,
        DatasetSource::new(&config.jd_dataset)
            .with_subset(&config.jd_subset)
            .with_split(&config.jd_split),
        mapping,
    );

    let mut generator = AtsGroundTruthGenerator::new(
        resume_loader,
        job_loader,
        Arc::new(KeywordScoreEngine),
        config.cache_dir.clone(),
    );

    generator
        .load_data(&DataLoadOptions {
            resume_limit: config.resume_limit,
            jd_limit: config.jd_limit,
            ..DataLoadOptions::default()
        })
        .await?;

    if config.save_cache {
        generator.save_cache()?;
    }

    let stats = generator
        .generate_dataset(
            &config.output_path,
            &GenerationOptions {
                pairs_per_resume: config.pairs_per_resume,
                min_score: config.min_score,
                max_score: config.max_score,
                pair_delay: config.pair_delay,
            },
        )
        .await?;

    info!(
        "Done: {} pairs ({} candidates, {} scoring failures, {} filtered), mean score {:.1}",
        stats.total_pairs,
        stats.candidate_pairs,
        stats.scoring_failures,
        stats.filtered_out,
        stats.mean_score
    );

    Ok(())
}

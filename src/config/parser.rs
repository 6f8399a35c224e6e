use crate::config::types::JobFile;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a job file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML job file
///
/// # Returns
///
/// * `Ok(JobFile)` - Successfully loaded and validated job
/// * `Err(ConfigError)` - Failed to load, parse, or validate the job
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use trellis_scrape::config::load_job;
///
/// let job = load_job(Path::new("job.toml")).unwrap();
/// println!("Concurrency: {}", job.scraper.concurrency);
/// ```
pub fn load_job(path: &Path) -> Result<JobFile, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_job(&content)
}

/// Parses and validates a job from TOML text
pub fn parse_job(content: &str) -> Result<JobFile, ConfigError> {
    let job: JobFile = toml::from_str(content)?;
    validate(&job)?;
    Ok(job)
}

/// Computes a SHA-256 hash of the job file content
///
/// Logged at startup so two runs can be told apart by their configuration.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a job and returns both the job and its hash
pub fn load_job_with_hash(path: &Path) -> Result<(JobFile, String), ConfigError> {
    let job = load_job(path)?;
    let hash = compute_config_hash(path)?;
    Ok((job, hash))
}

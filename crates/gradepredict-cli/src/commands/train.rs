//! The `gradepredict train` command.

use std::path::PathBuf;

use anyhow::Result;

use gradepredict_predictors::{create_trainer, load_config_from};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let trainer = create_trainer(config.trainer.as_ref())?;

    eprintln!("Training with `{}`...", trainer.program());
    let run = trainer.run().await?;

    for line in &run.info {
        println!("{line}");
    }
    for line in &run.warnings {
        eprintln!("Warning: {line}");
    }
    let stdout = run.stdout.trim();
    if !stdout.is_empty() {
        println!("{stdout}");
    }
    println!("Training finished in {:.1}s", run.duration.as_secs_f64());
    Ok(())
}

//! `doctor`: database diagnostics plus a scan for entries whose image is gone.

use anyhow::{Context, Result};

use pictolog::config::PictologConfig;
use pictolog::db;

pub fn doctor(config: &PictologConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Database: not found at {}", db_path.display());
        println!("Run `pictolog write` to create it.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path).map(|m| m.len()).unwrap_or(0);

    let report = {
        let conn = db::open_database(&db_path).context("failed to open database (may be corrupt)")?;
        db::check_database_health(&conn).context("failed to run health check")?
    };

    println!("Pictolog Health Report");
    println!("======================");
    println!();
    println!("Database:          {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Image folder:      {}", config.resolved_image_dir().display());
    println!("Schema version:    {}", report.schema_version);
    println!("sqlite-vec:        {}", report.sqlite_vec_version);
    println!();
    println!("Embedding model:");
    println!("  Stored:          {}", report.embedding_model.as_deref().unwrap_or("(not set)"));
    println!("  Configured:      {}", config.embedding.model);
    if let Some(stored) = &report.embedding_model {
        if stored != &config.embedding.model {
            println!("  WARNING: model mismatch; similarity against older entries is unreliable.");
        }
    }
    println!();
    println!("Row counts:");
    println!("  Diaries:         {}", report.diary_count);
    println!("  Vectors:         {}", report.vector_count);
    println!("  Audit log:       {}", report.log_count);
    if report.diary_count != report.vector_count {
        println!("  WARNING: diary and vector counts differ.");
    }
    println!();

    let dangling = super::open_store(config)?.find_dangling_images()?;
    if dangling.is_empty() {
        println!("Images:            OK");
    } else {
        println!("Images:            {} entr{} missing their image", dangling.len(), if dangling.len() == 1 { "y" } else { "ies" });
        for record in &dangling {
            if let Some(path) = &record.metadata.image_path {
                println!("  {}  {}", record.id, path.display());
            }
        }
    }

    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a backup copy of {}", db_path.display());
        println!("  2. Or export what is readable: pictolog export > backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::format_bytes;

    #[test]
    fn bytes_are_humanized() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}

use anyhow::Result;
use chrono::NaiveDate;

use pictolog::config::PictologConfig;

/// Print every entry written for `date`, oldest first.
pub fn show(config: &PictologConfig, date: NaiveDate) -> Result<()> {
    let store = super::open_store(config)?;
    let records = store.load_by_date(date)?;

    if records.is_empty() {
        println!("No diary for {date}.");
        return Ok(());
    }

    println!("{date}: {} entr{}", records.len(), if records.len() == 1 { "y" } else { "ies" });
    println!("{}", "=".repeat(40));
    for record in &records {
        let time = if record.metadata.time.is_empty() {
            "Unknown time"
        } else {
            record.metadata.time.as_str()
        };
        println!();
        println!(
            "[{time}] {} / {}  ({})",
            record.metadata.mood, record.metadata.style, record.id
        );
        println!("{}", record.text.trim());

        match (store.resolve_image(record), &record.metadata.image_path) {
            (Some(path), _) => println!("  image: {}", path.display()),
            (None, Some(missing)) => println!("  image: (missing) {}", missing.display()),
            (None, None) => {}
        }
    }
    Ok(())
}

use anyhow::Result;
use serde::Serialize;

use pictolog::config::PictologConfig;
use pictolog::diary::DiaryRecord;

#[derive(Debug, Serialize)]
struct ExportData {
    diaries: Vec<DiaryRecord>,
}

/// Export every entry as JSON to stdout.
pub fn export(config: &PictologConfig) -> Result<()> {
    let store = super::open_store(config)?;
    let data = ExportData {
        diaries: store.all_records()?,
    };

    println!("{}", serde_json::to_string_pretty(&data)?);
    eprintln!("Exported {} diaries.", data.diaries.len());
    Ok(())
}

use anyhow::Result;

use pictolog::config::PictologConfig;

/// Delete an entry and its image.
pub fn delete(config: &PictologConfig, id: &str) -> Result<()> {
    let mut store = super::open_store(config)?;
    if store.get(id)?.is_none() {
        println!("No diary with id {id}.");
        return Ok(());
    }
    store.delete(id)?;
    println!("Deleted {id}");
    Ok(())
}

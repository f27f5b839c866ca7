use crate::cli::ReleaseArgs;
use crate::core::config::Config;
use crate::core::error::Result;
use crate::index::TantivyIndex;
use crate::reuse::source::ReleaseLookup;
use std::collections::BTreeMap;

/// Run the release command
pub fn run(args: ReleaseArgs) -> Result<()> {
    let name = args
        .index
        .clone()
        .unwrap_or_else(|| repository_of(&args.logicalid).to_string());
    let index = TantivyIndex::open(&Config::index_dir(&name)?)?;

    let checksums: BTreeMap<String, String> = index
        .release_checksums(&args.logicalid)?
        .into_iter()
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&checksums)?);
        return Ok(());
    }

    if checksums.is_empty() {
        println!("No indexed elements with a RID for {}", args.logicalid);
        return Ok(());
    }
    println!("{} ({} elements):", args.logicalid, checksums.len());
    for (rid, checksum) in &checksums {
        println!("  {}  {}", rid, checksum);
    }
    Ok(())
}

/// `demo` for `demo^/release/a.xml?p=4`
fn repository_of(logical_id: &str) -> &str {
    logical_id
        .split_once('^')
        .map_or(logical_id, |(repo, _)| repo)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_of() {
        assert_eq!(repository_of("demo^/release/a.xml?p=4"), "demo");
        assert_eq!(repository_of("plain"), "plain");
    }
}

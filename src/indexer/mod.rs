//! Document and change-set driver
//!
//! Ties normalization, parsing, extraction and the batch writer together.
//! A malformed document is flagged on its summary record and indexing moves
//! on; a missing base field writes nothing; an extractor fault removes every
//! record of the path so the index never holds a half-indexed document.

pub mod change;

pub use change::{ChangeAction, ChangeReport, DocumentOutcome, PathChange, PathFailure};

use crate::core::config::Config;
use crate::core::error::{Error, Result};
use crate::extract::{path_id_prefix, DocumentContext, DocumentInfo, FieldRecord, Pipeline};
use crate::index::{BatchStats, BatchWriter, IndexBackend};
use crate::parse::{parse_document, NormalizeParams, Normalizer, XmlDocument, XmlNormalizer};
use crate::reuse::source::{CachedReleaseLookup, ReleaseLookup};
use std::sync::Arc;
use tracing::{error, info, warn};

type ReleaseCache = CachedReleaseLookup<Arc<dyn ReleaseLookup>>;

pub struct XmlIndexer<B: IndexBackend> {
    config: Config,
    normalizer: Box<dyn Normalizer>,
    pipeline: Pipeline,
    writer: BatchWriter<B>,
    releases: Arc<ReleaseCache>,
}

impl<B: IndexBackend> XmlIndexer<B> {
    /// `lookup` resolves Releases for Translations, normally the index `backend` writes to
    pub fn new(config: Config, backend: B, lookup: Arc<dyn ReleaseLookup>) -> Result<Self> {
        let releases = Arc::new(CachedReleaseLookup::new(
            lookup,
            config.reuse.release_cache_size,
        ));
        let pipeline = Pipeline::standard(&config.reuse, releases.clone())?;
        let normalizer = Box::new(XmlNormalizer::new(config.reuse.marker_pis.clone()));
        let writer = BatchWriter::new(backend, &config.index);

        Ok(Self {
            config,
            normalizer,
            pipeline,
            writer,
            releases,
        })
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    pub fn writer(&self) -> &BatchWriter<B> {
        &self.writer
    }

    /// Index one document: its element records, then its summary record
    pub fn index_document(
        &mut self,
        base: &FieldRecord,
        content: &[u8],
    ) -> Result<DocumentOutcome> {
        let info = DocumentInfo::from_base(base, &self.config.reuse)?;
        let depth_limit = if info.is_translation() {
            // Its Release may still sit in the open batch
            self.writer.sync()?;
            self.config.reuse.translation_depth_limit
        } else {
            None
        };

        let document = match self.read(&info, content, depth_limit) {
            Ok(document) => document,
            Err(Error::MalformedXml { message, .. }) => {
                warn!(path = %info.path, error = %message, "Malformed XML, indexing summary only");
                self.writer.abort_path(&info.repo, &info.path)?;

                let mut summary = summary_record(base, &info);
                summary.set("xml_has", "false");
                summary.set("xml_error", message.as_str());
                self.writer.add(summary)?;
                return Ok(DocumentOutcome::Malformed { message });
            }
            Err(e) => return Err(e),
        };

        let mut ctx = DocumentContext::new(&document, base, info.clone());
        let output = match self.pipeline.run(&mut ctx) {
            Ok(output) => output,
            Err(e) => {
                error!(path = %info.path, error = %e, "Extraction failed, removing path");
                self.writer.abort_path(&info.repo, &info.path)?;
                return Err(e);
            }
        };

        let mut elements = 0;
        for record in output.records {
            if within_depth(&record, depth_limit) {
                self.writer.add(record)?;
                elements += 1;
            }
        }

        let mut summary = summary_record(base, &info);
        summary.set("xml_has", "true");
        summary.set("xml_elements", document.len().to_string());
        summary.set("xml_root", document.root().name.qualified());
        for (key, values) in output.summary.iter() {
            for value in values {
                summary.add(key, value.as_str());
            }
        }
        self.writer.add(summary)?;

        // A cached map of this document as a Release is stale now
        self.releases.invalidate(&info.logical_id());

        info!(
            path = %info.path,
            rev = info.rev,
            elements,
            translation = info.is_translation(),
            "Indexed document"
        );
        Ok(DocumentOutcome::Indexed { elements })
    }

    /// Apply the changes of one revision in order
    ///
    /// Failures local to a document are reported and the next path is
    /// processed; index failures stop the run.
    pub fn index_changes(&mut self, changes: &[PathChange]) -> Result<ChangeReport> {
        let mut report = ChangeReport::default();

        for change in changes {
            match self.apply(change) {
                Ok(None) => report.deleted += 1,
                Ok(Some(DocumentOutcome::Indexed { elements })) => {
                    report.indexed += 1;
                    report.elements += elements;
                }
                Ok(Some(DocumentOutcome::Malformed { .. })) => {
                    report.malformed.push(change.path().to_string());
                }
                Err(e) if e.is_document_local() => {
                    warn!(path = change.path(), error = %e, "Path not indexed");
                    report.failed.push(PathFailure {
                        path: change.path().to_string(),
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }

    /// Flush what is still pending and commit
    pub fn finish(&mut self) -> Result<BatchStats> {
        self.writer.end()
    }

    fn apply(&mut self, change: &PathChange) -> Result<Option<DocumentOutcome>> {
        let info = DocumentInfo::from_base(&change.base, &self.config.reuse)?;

        if matches!(change.action, ChangeAction::Modify | ChangeAction::Delete) {
            self.writer.delete_path(&info.repo, &info.path)?;
            self.releases
                .invalidate_prefix(&path_id_prefix(&info.repo, &info.path));
        }
        if change.action == ChangeAction::Delete {
            info!(path = %info.path, rev = info.rev, "Deleted document");
            return Ok(None);
        }

        let content = change.content.as_deref().ok_or_else(|| Error::MissingField {
            field: "content".to_string(),
        })?;
        self.index_document(&change.base, content).map(Some)
    }

    fn read(
        &self,
        info: &DocumentInfo,
        content: &[u8],
        depth_limit: Option<u32>,
    ) -> Result<XmlDocument> {
        let raw = std::str::from_utf8(content).map_err(|e| Error::malformed(&info.path, e))?;
        let params = NormalizeParams {
            document_status: info.status.clone(),
            path_area: info.path_area(),
            depth_limit,
        };
        let normalized = self.normalizer.normalize(&info.path, raw, &params)?;
        parse_document(&info.path, &normalized)
    }
}

fn summary_record(base: &FieldRecord, info: &DocumentInfo) -> FieldRecord {
    let logical_id = info.logical_id();
    let mut summary = base.clone();
    summary.set("id", logical_id.as_str());
    summary.set("logicalid", logical_id);
    summary.set("type", "file");
    summary
}

fn within_depth(record: &FieldRecord, limit: Option<u32>) -> bool {
    let Some(limit) = limit else {
        return true;
    };
    record
        .first("depth")
        .and_then(|d| d.parse::<u32>().ok())
        .map_or(true, |depth| depth <= limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::identity::IdentityExtractor;
    use crate::extract::ElementExtractor;
    use crate::index::MemoryIndex;
    use crate::parse::ElementNode;
    use std::collections::BTreeSet;

    const CMS: &str = "xmlns:cms=\"http://xmldex.dev/ns/cms\"";

    fn indexer(index: &MemoryIndex) -> XmlIndexer<MemoryIndex> {
        XmlIndexer::new(Config::default(), index.clone(), Arc::new(index.clone())).unwrap()
    }

    fn base(path: &str, rev: u64) -> FieldRecord {
        [
            ("repo", "demo".to_string()),
            ("path", path.to_string()),
            ("rev", rev.to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn elements(index: &MemoryIndex, path: &str) -> Vec<FieldRecord> {
        index
            .find("path", path)
            .into_iter()
            .filter(|r| r.first("type") == Some("xml"))
            .collect()
    }

    fn summary(index: &MemoryIndex, path: &str) -> FieldRecord {
        let mut found: Vec<_> = index
            .find("path", path)
            .into_iter()
            .filter(|r| r.first("type") == Some("file"))
            .collect();
        assert_eq!(found.len(), 1);
        found.remove(0)
    }

    fn ids(index: &MemoryIndex) -> BTreeSet<String> {
        index
            .records()
            .iter()
            .filter_map(|r| r.first("id").map(str::to_string))
            .collect()
    }

    #[test]
    fn test_add_then_delete_path() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        let report = indexer
            .index_changes(&[PathChange::add(
                base("/a.xml", 1),
                "<doc>\n  <p>Hello <b>world</b></p>\n</doc>",
            )])
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(report.indexed, 1);
        assert_eq!(report.elements, 3);
        assert_eq!(elements(&index, "/a.xml").len(), 3);
        let file = summary(&index, "/a.xml");
        assert_eq!(file.first("id"), Some("demo^/a.xml?p=1"));
        assert_eq!(file.first("xml_has"), Some("true"));
        assert_eq!(file.first("xml_elements"), Some("3"));
        assert_eq!(file.first("xml_root"), Some("doc"));

        let report = indexer
            .index_changes(&[PathChange::delete(base("/a.xml", 2))])
            .unwrap();
        indexer.finish().unwrap();
        assert_eq!(report.deleted, 1);
        assert!(index.is_empty());
    }

    #[test]
    fn test_reindex_same_revision_is_idempotent() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);
        let xml = "<doc><p>one</p><p>two</p></doc>";

        indexer
            .index_changes(&[PathChange::add(base("/a.xml", 5), xml)])
            .unwrap();
        indexer.finish().unwrap();
        let first = ids(&index);

        indexer
            .index_changes(&[PathChange::modify(base("/a.xml", 5), xml)])
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(ids(&index), first);
        assert_eq!(index.len(), 4);
    }

    #[test]
    fn test_modify_replaces_previous_revision() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        indexer
            .index_changes(&[PathChange::add(base("/a.xml", 1), "<doc><p/></doc>")])
            .unwrap();
        indexer
            .index_changes(&[PathChange::modify(base("/a.xml", 2), "<doc/>")])
            .unwrap();
        indexer.finish().unwrap();

        let ids = ids(&index);
        assert_eq!(
            ids,
            ["demo^/a.xml?p=2", "demo^/a.xml?p=2|000001"]
                .into_iter()
                .map(str::to_string)
                .collect()
        );
    }

    #[test]
    fn test_translation_matches_release_checksum() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        let mut release = base("/release/a.xml", 4);
        release.set("prop_cms.status", "Released");
        let release_xml = format!(
            "<doc {} cms:rlogicalid=\"x-svn:///demo/a\" cms:rid=\"r0\"><p cms:rid=\"r1\">Hello <ph cms:rid=\"r2\">{{x}}</ph></p></doc>",
            CMS
        );
        indexer
            .index_changes(&[PathChange::add(release, release_xml)])
            .unwrap();
        indexer.finish().unwrap();

        let release_p = index.find("reuse_rid", "r1");
        assert_eq!(release_p.len(), 1);
        let checksum = release_p[0].first("reuse_checksum").unwrap().to_string();
        assert_eq!(release_p[0].first("reusevalue"), Some("1"));
        assert_eq!(release_p[0].first("reuseready"), Some("1"));

        let mut translation = base("/sv/a.xml", 7);
        translation.set("prop_abx.TranslationMaster", "demo^/release/a.xml?p=4");
        let translation_xml = format!(
            "<doc {} cms:rlogicalid=\"x-svn:///demo/a\" cms:rid=\"r0\"><p cms:rid=\"r1\">Hej <ph cms:rid=\"r2\">{{y}}</ph></p><p cms:rid=\"r9\">Ny</p></doc>",
            CMS
        );
        indexer
            .index_changes(&[PathChange::add(translation, translation_xml)])
            .unwrap();
        indexer.finish().unwrap();

        let translated: Vec<_> = elements(&index, "/sv/a.xml")
            .into_iter()
            .filter(|r| r.first("reuse_rid") == Some("r1"))
            .collect();
        assert_eq!(translated.len(), 1);
        assert_eq!(
            translated[0].first("reuse_source_checksum"),
            Some(checksum.as_str())
        );
        assert_ne!(translated[0].first("reuse_checksum"), Some(checksum.as_str()));

        let file = summary(&index, "/sv/a.xml");
        assert_eq!(file.first("reuse_source"), Some("demo^/release/a.xml?p=4"));
        assert_eq!(file.first("reuse_source_missing"), Some("1"));
    }

    #[test]
    fn test_delete_drops_records_still_pending() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        indexer
            .index_changes(&[
                PathChange::add(base("/a.xml", 1), "<doc><p/></doc>"),
                PathChange::delete(base("/a.xml", 2)),
            ])
            .unwrap();
        assert_eq!(indexer.writer().pending(), 0);
        indexer.finish().unwrap();

        assert!(index.is_empty());
    }

    fn translation_of_release(lang: &str, rev: u64) -> (FieldRecord, String) {
        let mut translation = base(&format!("/{}/a.xml", lang), rev);
        translation.set("prop_abx.TranslationMaster", "demo^/release/a.xml?p=4");
        let xml = format!(
            "<doc {} cms:rid=\"r0\"><p cms:rid=\"r1\">{}</p></doc>",
            CMS, lang
        );
        (translation, xml)
    }

    #[test]
    fn test_translations_see_release_from_same_run() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        let mut release = base("/release/a.xml", 4);
        release.set("prop_cms.status", "Released");
        let release_xml = format!("<doc {} cms:rid=\"r0\"><p cms:rid=\"r1\">en</p></doc>", CMS);
        let (sv, sv_xml) = translation_of_release("sv", 5);
        indexer
            .index_changes(&[
                PathChange::add(release, release_xml),
                PathChange::add(sv, sv_xml),
            ])
            .unwrap();
        indexer.finish().unwrap();

        let (de, de_xml) = translation_of_release("de", 6);
        indexer
            .index_changes(&[PathChange::add(de, de_xml)])
            .unwrap();
        indexer.finish().unwrap();

        let released = index.find("path", "/release/a.xml");
        let checksum = released
            .iter()
            .find(|r| r.first("reuse_rid") == Some("r1"))
            .and_then(|r| r.first("reuse_checksum"))
            .unwrap()
            .to_string();
        for path in ["/sv/a.xml", "/de/a.xml"] {
            let p = elements(&index, path)
                .into_iter()
                .find(|r| r.first("reuse_rid") == Some("r1"))
                .unwrap();
            assert_eq!(p.first("reuse_source_checksum"), Some(checksum.as_str()), "{path}");
            assert_eq!(summary(&index, path).first("reuse_source_missing"), Some("0"));
        }
    }

    struct Unavailable;

    impl ReleaseLookup for Unavailable {
        fn release_checksums(&self, _: &str) -> Result<std::collections::HashMap<String, String>> {
            Err(Error::IndexError {
                message: "index is locked".to_string(),
            })
        }
    }

    #[test]
    fn test_release_lookup_failure_fails_only_the_translation() {
        let index = MemoryIndex::new();
        let mut indexer =
            XmlIndexer::new(Config::default(), index.clone(), Arc::new(Unavailable)).unwrap();

        let (sv, sv_xml) = translation_of_release("sv", 5);
        let report = indexer
            .index_changes(&[
                PathChange::add(sv, sv_xml),
                PathChange::add(base("/b.xml", 5), "<doc/>"),
            ])
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "/sv/a.xml");
        assert!(report.failed[0].message.contains("index is locked"));
        assert_eq!(report.indexed, 1);
        assert!(index.find("path", "/sv/a.xml").is_empty());
    }

    #[test]
    fn test_translation_depth_limit() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        let mut translation = base("/sv/deep.xml", 2);
        translation.set("prop_abx.TranslationMaster", "demo^/release/deep.xml?p=1");
        indexer
            .index_document(&translation, b"<doc><sec><p><b>x</b></p></sec></doc>")
            .unwrap();
        let xml = b"<doc><sec><p><b>x</b></p></sec></doc>";
        indexer
            .index_document(&base("/release/deep.xml", 1), xml)
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(elements(&index, "/sv/deep.xml").len(), 3);
        assert_eq!(summary(&index, "/sv/deep.xml").first("xml_elements"), Some("4"));
        assert_eq!(elements(&index, "/release/deep.xml").len(), 4);
    }

    #[test]
    fn test_malformed_document_flags_summary() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);

        let report = indexer
            .index_changes(&[
                PathChange::add(base("/bad.xml", 3), "<doc><p></doc>"),
                PathChange::add(base("/good.xml", 3), "<doc/>"),
            ])
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(report.malformed, ["/bad.xml"]);
        assert_eq!(report.indexed, 1);
        assert!(elements(&index, "/bad.xml").is_empty());
        let file = summary(&index, "/bad.xml");
        assert_eq!(file.first("xml_has"), Some("false"));
        assert!(file.first("xml_error").is_some_and(|e| !e.is_empty()));
        assert_eq!(elements(&index, "/good.xml").len(), 1);
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);
        let outcome = indexer
            .index_document(&base("/bin.xml", 1), &[b'<', 0xff, b'/', b'>'])
            .unwrap();
        assert!(matches!(outcome, DocumentOutcome::Malformed { .. }));
    }

    #[test]
    fn test_missing_repo_writes_nothing() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);
        let base: FieldRecord = [("path", "/a.xml"), ("rev", "1")].into_iter().collect();

        let err = indexer.index_document(&base, b"<doc/>").unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field } if field == "repo"));
        assert_eq!(indexer.writer().pending(), 0);

        let report = indexer
            .index_changes(&[PathChange::add(base, "<doc/>")])
            .unwrap();
        indexer.finish().unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "/a.xml");
        assert!(index.is_empty());
    }

    #[test]
    fn test_suppressed_and_skip_validation() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);
        let xml = format!(
            "<doc {}><p cms:tsuppress=\"yes\">a</p><sec cms:tvalidate=\"no\"><p>b</p></sec></doc>",
            CMS
        );
        indexer.index_document(&base("/a.xml", 1), xml.as_bytes()).unwrap();
        indexer.finish().unwrap();

        let value = |pos: &str| {
            let found = index.find("pos", pos);
            found[0].first("reusevalue").map(str::to_string)
        };
        assert_eq!(value("1").as_deref(), Some("-2"));
        assert_eq!(value("1.1").as_deref(), Some("-1"));
        assert_eq!(value("1.2").as_deref(), Some("1"));
        assert_eq!(value("1.2.1").as_deref(), Some("-3"));
        // No status property: nothing is ready for reuse
        assert_eq!(summary(&index, "/a.xml").first("reuseready"), Some("0"));
    }

    struct FailOn(&'static str);

    impl ElementExtractor for FailOn {
        fn name(&self) -> &'static str {
            "fail_on"
        }

        fn end(
            &self,
            node: &ElementNode,
            _: &mut DocumentContext<'_>,
            _: &mut FieldRecord,
        ) -> Result<()> {
            if node.name.local == self.0 {
                return Err(Error::extractor(self.name(), "unexpected element"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_extractor_fault_removes_path_and_continues() {
        let index = MemoryIndex::new();
        let mut indexer = indexer(&index);
        indexer
            .index_changes(&[PathChange::add(base("/a.xml", 1), "<doc><p/></doc>")])
            .unwrap();
        indexer.finish().unwrap();
        assert_eq!(index.len(), 3);

        let mut indexer = XmlIndexer::new(Config::default(), index.clone(), Arc::new(index.clone()))
            .unwrap()
            .with_pipeline(
                Pipeline::new(vec![Box::new(IdentityExtractor), Box::new(FailOn("bad"))]).unwrap(),
            );
        let report = indexer
            .index_changes(&[
                PathChange::add(base("/a.xml", 2), "<doc><bad/></doc>"),
                PathChange::add(base("/b.xml", 2), "<doc/>"),
            ])
            .unwrap();
        indexer.finish().unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, "/a.xml");
        assert!(index.find("path", "/a.xml").is_empty());
        assert_eq!(index.find("path", "/b.xml").len(), 2);
    }
}

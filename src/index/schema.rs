use tantivy::schema::{
    Field, IndexRecordOption, JsonObjectOptions, Schema, TextFieldIndexing, TextOptions, STORED,
    STRING,
};

pub const FIELD_ID: &str = "id";
pub const FIELD_PATH: &str = "path";
pub const FIELD_REPO: &str = "repo";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_LOGICALID: &str = "logicalid";
pub const FIELD_REUSE_RID: &str = "reuse_rid";
pub const FIELD_REUSE_CHECKSUM: &str = "reuse_checksum";
pub const FIELD_TEXT: &str = "text";
/// JSON object holding the complete record
pub const FIELD_FIELDS: &str = "fields";

#[derive(Clone)]
pub struct IndexSchema {
    pub schema: Schema,
    pub id: Field,
    pub path: Field,
    pub repo: Field,
    pub kind: Field,
    pub logicalid: Field,
    pub reuse_rid: Field,
    pub reuse_checksum: Field,
    pub text: Field,
    pub fields: Field,
}

impl IndexSchema {
    pub fn new() -> Self {
        let mut builder = Schema::builder();

        // Element id "{repo}^{path}?p={rev}|{n}", summary id without the "|{n}"
        let id = builder.add_text_field(FIELD_ID, STRING | STORED);
        let path = builder.add_text_field(FIELD_PATH, STRING | STORED);
        let repo = builder.add_text_field(FIELD_REPO, STRING | STORED);

        // "xml" for elements, "file" for the document summary
        let kind = builder.add_text_field(FIELD_TYPE, STRING | STORED);

        // Join keys for Translation-vs-Release lookups
        let logicalid = builder.add_text_field(FIELD_LOGICALID, STRING | STORED);
        let reuse_rid = builder.add_text_field(FIELD_REUSE_RID, STRING | STORED);
        let reuse_checksum = builder.add_text_field(FIELD_REUSE_CHECKSUM, STRING | STORED);

        // Element text - full text with positions
        let text_opts = TextOptions::default()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("default")
                    .set_index_option(IndexRecordOption::WithFreqsAndPositions),
            )
            .set_stored();
        let text = builder.add_text_field(FIELD_TEXT, text_opts);

        // Everything else, untokenized so attribute values match exactly
        let fields_opts = JsonObjectOptions::default()
            .set_stored()
            .set_indexing_options(
                TextFieldIndexing::default()
                    .set_tokenizer("raw")
                    .set_index_option(IndexRecordOption::Basic),
            );
        let fields = builder.add_json_field(FIELD_FIELDS, fields_opts);

        Self {
            schema: builder.build(),
            id,
            path,
            repo,
            kind,
            logicalid,
            reuse_rid,
            reuse_checksum,
            text,
            fields,
        }
    }

    /// Top-level fields copied out of the record besides the JSON object
    pub fn direct_fields() -> &'static [&'static str] {
        &[
            FIELD_ID,
            FIELD_PATH,
            FIELD_REPO,
            FIELD_TYPE,
            FIELD_LOGICALID,
            FIELD_REUSE_RID,
            FIELD_REUSE_CHECKSUM,
            FIELD_TEXT,
        ]
    }
}

impl Default for IndexSchema {
    fn default() -> Self {
        Self::new()
    }
}

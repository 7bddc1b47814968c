use redb::TableDefinition;

/// File documents: object id hex -> FileRecord (msgpack)
pub type FilesTable<'a> = TableDefinition<'a, &'static str, &'static [u8]>;

/// Chunks: (object id hex, sequence number) -> raw chunk bytes
pub type ChunksTable<'a> = TableDefinition<'a, (&'static str, u32), &'static [u8]>;

pub fn files_table_name(bucket: &str) -> String {
    format!("{bucket}.files")
}

pub fn chunks_table_name(bucket: &str) -> String {
    format!("{bucket}.chunks")
}

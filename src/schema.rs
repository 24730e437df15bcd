use sea_query::Iden;

/// Recordings table - one row per uploaded clip
#[derive(Iden)]
pub enum Recordings {
    Table,
    Id,
    Title,
    Filename,
    Filepath,
    Filesize,
    CreatedAt,
}

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::Recordings;

const ALL_COLUMNS: [Recordings; 6] = [
    Recordings::Id,
    Recordings::Title,
    Recordings::Filename,
    Recordings::Filepath,
    Recordings::Filesize,
    Recordings::CreatedAt,
];

/// INSERT INTO recordings (title, filename, filepath, filesize, created_at) VALUES (?, ?, ?, ?, ?)
pub fn insert(
    title: &str,
    filename: &str,
    filepath: &str,
    filesize: i64,
    created_at: &str,
) -> String {
    Query::insert()
        .into_table(Recordings::Table)
        .columns([
            Recordings::Title,
            Recordings::Filename,
            Recordings::Filepath,
            Recordings::Filesize,
            Recordings::CreatedAt,
        ])
        .values_panic([
            title.into(),
            filename.into(),
            filepath.into(),
            filesize.into(),
            created_at.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, title, filename, filepath, filesize, created_at FROM recordings
/// ORDER BY created_at DESC, id DESC
pub fn select_all() -> String {
    Query::select()
        .columns(ALL_COLUMNS)
        .from(Recordings::Table)
        .order_by(Recordings::CreatedAt, Order::Desc)
        .order_by(Recordings::Id, Order::Desc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, title, filename, filepath, filesize, created_at FROM recordings WHERE id = ?
pub fn select_by_id(id: i64) -> String {
    Query::select()
        .columns(ALL_COLUMNS)
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT filepath FROM recordings WHERE id = ?
pub fn select_filepath_by_id(id: i64) -> String {
    Query::select()
        .column(Recordings::Filepath)
        .from(Recordings::Table)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE recordings SET title = ? WHERE id = ?
pub fn update_title(id: i64, title: &str) -> String {
    Query::update()
        .table(Recordings::Table)
        .value(Recordings::Title, title)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM recordings WHERE id = ?
pub fn delete_by_id(id: i64) -> String {
    Query::delete()
        .from_table(Recordings::Table)
        .and_where(Expr::col(Recordings::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

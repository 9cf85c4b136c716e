//! Database schema and migrations for stockchat.
//!
//! Migrations are applied in order when the database is opened.

/// Database migrations.
///
/// Each migration is a SQL script. The schema_version table tracks which
/// migrations have been applied.
pub const MIGRATIONS: &[&str] = &[
    // v1: users
    r#"
CREATE TABLE users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
    password    TEXT NOT NULL,           -- Argon2 hash
    created_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v2: rooms
    r#"
CREATE TABLE rooms (
    id          TEXT PRIMARY KEY,        -- UUID
    name        TEXT NOT NULL UNIQUE COLLATE NOCASE,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);
"#,
    // v3: messages (chat and bot only)
    r#"
CREATE TABLE messages (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    room_id     TEXT NOT NULL REFERENCES rooms(id) ON DELETE CASCADE,
    user_id     INTEGER REFERENCES users(id) ON DELETE SET NULL,
    username    TEXT NOT NULL,
    content     TEXT NOT NULL,
    kind        TEXT NOT NULL,           -- 'chat' or 'bot'
    created_at  TEXT NOT NULL
);

CREATE INDEX idx_messages_room_id ON messages(room_id, id);
"#,
];

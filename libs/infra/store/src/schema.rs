use crate::errors::StoreError;
use sqlx::AnyPool;
use tracing::debug;

/// Idempotent `CREATE TABLE IF NOT EXISTS` bootstrap, run once on connect.
/// Real deployments are expected to layer a migration tool on top of this;
/// this workspace only needs a schema that exists (spec §1 excludes
/// migration tooling as an external collaborator).
const TABLES: &[(&str, &str)] = &[
    (
        "users",
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            courier_id TEXT,
            permissions TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
    "#,
    ),
    (
        "opcodes",
        r#"
        CREATE TABLE IF NOT EXISTS opcodes (
            code TEXT PRIMARY KEY,
            school_name TEXT NOT NULL,
            area_name TEXT NOT NULL,
            building_type TEXT NOT NULL,
            point_type TEXT NOT NULL,
            is_public BOOLEAN NOT NULL DEFAULT 0
        );
    "#,
    ),
    (
        "couriers",
        r#"
        CREATE TABLE IF NOT EXISTS couriers (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            level TEXT NOT NULL,
            parent_id TEXT,
            managed_prefixes TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'pending_approval',
            open_task_count INTEGER NOT NULL DEFAULT 0,
            completed_task_count INTEGER NOT NULL DEFAULT 0,
            recent_success_rate REAL NOT NULL DEFAULT 0.0
        );
    "#,
    ),
    (
        "courier_upgrade_requests",
        r#"
        CREATE TABLE IF NOT EXISTS courier_upgrade_requests (
            id TEXT PRIMARY KEY,
            courier_id TEXT NOT NULL,
            current_level TEXT NOT NULL,
            requested_level TEXT NOT NULL,
            reason TEXT NOT NULL,
            evidence TEXT NOT NULL DEFAULT '[]',
            status TEXT NOT NULL DEFAULT 'pending',
            reviewer_id TEXT,
            reviewer_comment TEXT,
            created_at TEXT NOT NULL,
            reviewed_at TEXT
        );
    "#,
    ),
    (
        "courier_tasks",
        r#"
        CREATE TABLE IF NOT EXISTS courier_tasks (
            id TEXT PRIMARY KEY,
            letter_id TEXT NOT NULL,
            recipient_opcode TEXT NOT NULL,
            assigned_courier_id TEXT,
            status TEXT NOT NULL DEFAULT 'unassigned',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
    "#,
    ),
    (
        "letters",
        r#"
        CREATE TABLE IF NOT EXISTS letters (
            id TEXT PRIMARY KEY,
            author_id TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            style TEXT NOT NULL DEFAULT 'default',
            status TEXT NOT NULL DEFAULT 'draft',
            visibility TEXT NOT NULL DEFAULT 'private',
            like_count INTEGER NOT NULL DEFAULT 0,
            sender_opcode TEXT,
            recipient_opcode TEXT,
            created_at TEXT NOT NULL
        );
    "#,
    ),
    (
        "letter_codes",
        r#"
        CREATE TABLE IF NOT EXISTS letter_codes (
            code TEXT PRIMARY KEY,
            letter_id TEXT NOT NULL,
            envelope_id TEXT,
            status TEXT NOT NULL DEFAULT 'unactivated',
            bound_at TEXT,
            delivered_at TEXT,
            last_scanned_by TEXT,
            last_scanned_at TEXT,
            scan_count INTEGER NOT NULL DEFAULT 0,
            recipient_opcode TEXT,
            expires_at TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0
        );
    "#,
    ),
    (
        "status_logs",
        r#"
        CREATE TABLE IF NOT EXISTS status_logs (
            id TEXT PRIMARY KEY,
            letter_id TEXT NOT NULL,
            to_status TEXT NOT NULL,
            operator_id TEXT NOT NULL,
            location TEXT,
            note TEXT,
            timestamp TEXT NOT NULL
        );
    "#,
    ),
    (
        "credit_transactions",
        r#"
        CREATE TABLE IF NOT EXISTS credit_transactions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            reason_code TEXT NOT NULL,
            reference_id TEXT NOT NULL,
            amount INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE(user_id, reason_code, reference_id)
        );
    "#,
    ),
    (
        "audit_log",
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            request_id TEXT PRIMARY KEY,
            user_id TEXT,
            category TEXT NOT NULL,
            severity TEXT NOT NULL,
            result TEXT NOT NULL,
            resource TEXT NOT NULL,
            action TEXT NOT NULL,
            reason TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
    "#,
    ),
];

pub(crate) async fn apply_schema(pool: &AnyPool) -> Result<(), StoreError> {
    for (name, statement) in TABLES {
        debug!(table = *name, "applying schema");
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

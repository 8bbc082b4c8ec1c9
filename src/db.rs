use sqlx::{Pool, Postgres};

mod collection_point;
pub use collection_point::CollectionPointExt;

mod report;
pub use report::ReportExt;

mod user;
pub use user::UserExt;

/// Startup DDL. Enum types are created through exception-swallowing DO blocks
/// because `CREATE TYPE` has no `IF NOT EXISTS` form. The `collection_points`
/// DDL mirrors the PostGIS reference layout: geography(Point, 4326) column
/// plus a GiST index. `reports.collection_point` is intentionally a bare
/// integer: a soft reference with no enforced integrity.
const SCHEMA_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS postgis;

DO $$ BEGIN
    CREATE TYPE user_role AS ENUM ('user', 'admin', 'collector');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE report_type AS ENUM
        ('acumulacion', 'contenedor_lleno', 'contenedor_danado', 'vertedero_ilegal', 'otro');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE report_severity AS ENUM ('baja', 'media', 'alta', 'critica');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE report_status AS ENUM
        ('pendiente', 'en_revision', 'en_proceso', 'resuelto', 'rechazado');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

DO $$ BEGIN
    CREATE TYPE report_visibility AS ENUM ('public', 'private', 'restricted');
EXCEPTION WHEN duplicate_object THEN NULL;
END $$;

CREATE TABLE IF NOT EXISTS users (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(100) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    password VARCHAR(255) NOT NULL,
    phone VARCHAR(20),
    role user_role NOT NULL DEFAULT 'user',
    points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
    level TEXT NOT NULL DEFAULT 'Nuevo Ciudadano',
    avatar VARCHAR(500),
    address JSONB,
    preferences JSONB,
    total_reports INTEGER NOT NULL DEFAULT 0,
    verified_reports INTEGER NOT NULL DEFAULT 0,
    proper_disposals INTEGER NOT NULL DEFAULT 0,
    recycling_actions INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT true,
    last_login TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_users_points ON users (points DESC);

CREATE TABLE IF NOT EXISTS reports (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL REFERENCES users(id),
    type report_type NOT NULL,
    title VARCHAR(200) NOT NULL,
    description VARCHAR(1000) NOT NULL,
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    location_address TEXT,
    images TEXT[] NOT NULL DEFAULT '{}',
    severity report_severity NOT NULL DEFAULT 'media',
    status report_status NOT NULL DEFAULT 'pendiente',
    priority INTEGER NOT NULL DEFAULT 3 CHECK (priority BETWEEN 1 AND 5),
    assigned_to UUID REFERENCES users(id),
    collection_point INTEGER,
    verification JSONB,
    resolution JSONB,
    likes UUID[] NOT NULL DEFAULT '{}',
    comments JSONB NOT NULL DEFAULT '[]',
    visibility report_visibility NOT NULL DEFAULT 'public',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_reports_location ON reports USING GIST (location);
CREATE INDEX IF NOT EXISTS idx_reports_user_created ON reports (user_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_reports_status ON reports (status);
CREATE INDEX IF NOT EXISTS idx_reports_type ON reports (type);
CREATE INDEX IF NOT EXISTS idx_reports_created ON reports (created_at DESC);

CREATE TABLE IF NOT EXISTS collection_points (
    id SERIAL PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    description TEXT,
    address VARCHAR(500),
    type VARCHAR(50),
    capacity INTEGER,
    current_fill INTEGER NOT NULL DEFAULT 0,
    waste_types TEXT[],
    location GEOGRAPHY(POINT, 4326) NOT NULL,
    operating_hours JSONB,
    contact_phone VARCHAR(20),
    contact_email VARCHAR(100),
    is_active BOOLEAN NOT NULL DEFAULT true,
    image_url VARCHAR(500),
    created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
);

CREATE INDEX IF NOT EXISTS idx_collection_points_location
    ON collection_points USING GIST (location);
"#;

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }

    /// Create the PostGIS extension, enum types, tables and indexes if they
    /// do not exist yet.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }
}

use super::parsing::{
    env_optional, env_or_default, parse_bool, parse_cors_origins, parse_environment, parse_u16,
    parse_u32, parse_u64,
};
use super::secret::load_or_create_secret_key;
use super::types::{
    AdminSettings, ApiSettings, ConfigError, CorsSettings, DatabaseSettings, PracticeSettings,
    RedisSettings, RuntimeSettings, SecuritySettings, ServerHost, ServerPort, ServerSettings,
    Settings, TelemetrySettings,
};

impl Settings {
    pub(crate) fn load() -> Result<Self, ConfigError> {
        let host = env_or_default("REFORGE_HOST", "0.0.0.0");
        let port = env_or_default("REFORGE_PORT", "8000");

        let environment =
            parse_environment(env_optional("REFORGE_ENV").or_else(|| env_optional("ENVIRONMENT")));
        let strict_config =
            env_optional("REFORGE_STRICT_CONFIG").map(|value| parse_bool(&value)).unwrap_or(false)
                || environment.is_production();

        let project_name = env_or_default("PROJECT_NAME", "Reforge API");
        let version = env_or_default("VERSION", env!("CARGO_PKG_VERSION"));
        let api_v1_str = env_or_default("API_V1_STR", "/api/v1");

        let secret_key = match env_optional("SECRET_KEY") {
            Some(value) => value,
            None => load_or_create_secret_key(),
        };
        let access_token_expire_minutes = parse_u64(
            "ACCESS_TOKEN_EXPIRE_MINUTES",
            env_or_default("ACCESS_TOKEN_EXPIRE_MINUTES", "30"),
        )?;
        let refresh_token_expire_days = parse_u64(
            "REFRESH_TOKEN_EXPIRE_DAYS",
            env_or_default("REFRESH_TOKEN_EXPIRE_DAYS", "30"),
        )?;
        let algorithm = env_or_default("ALGORITHM", "HS256");

        let cors_origins = parse_cors_origins(env_optional("BACKEND_CORS_ORIGINS"))?;

        let postgres_server = env_or_default("POSTGRES_SERVER", "localhost");
        let postgres_port = parse_u16("POSTGRES_PORT", env_or_default("POSTGRES_PORT", "5432"))?;
        let postgres_user = env_or_default("POSTGRES_USER", "reforge");
        let postgres_password = env_or_default("POSTGRES_PASSWORD", "");
        let postgres_db = env_or_default("POSTGRES_DB", "reforge_db");
        let database_url = env_optional("DATABASE_URL");
        let max_connections =
            parse_u32("DATABASE_MAX_CONNECTIONS", env_or_default("DATABASE_MAX_CONNECTIONS", "20"))?;

        let redis_host = env_or_default("REDIS_HOST", "localhost");
        let redis_port = parse_u16("REDIS_PORT", env_or_default("REDIS_PORT", "6379"))?;
        let redis_db = parse_u16("REDIS_DB", env_or_default("REDIS_DB", "0"))?;
        let redis_password = env_or_default("REDIS_PASSWORD", "");

        let seed_email = env_or_default("SEED_ADMIN_EMAIL", "").to_ascii_lowercase();
        let seed_password = env_or_default("SEED_ADMIN_PASSWORD", "");
        let seed_name = env_or_default("SEED_ADMIN_NAME", "Administrator");

        let practice_defaults = PracticeSettings::default();
        let planned_min_easy = parse_u32(
            "PLANNED_MIN_EASY",
            env_or_default("PLANNED_MIN_EASY", &practice_defaults.planned_min_easy.to_string()),
        )?;
        let planned_min_medium = parse_u32(
            "PLANNED_MIN_MEDIUM",
            env_or_default("PLANNED_MIN_MEDIUM", &practice_defaults.planned_min_medium.to_string()),
        )?;
        let planned_min_hard = parse_u32(
            "PLANNED_MIN_HARD",
            env_or_default("PLANNED_MIN_HARD", &practice_defaults.planned_min_hard.to_string()),
        )?;
        let urgent_problems_limit = parse_u32(
            "URGENT_PROBLEMS_LIMIT",
            env_or_default(
                "URGENT_PROBLEMS_LIMIT",
                &practice_defaults.urgent_problems_limit.to_string(),
            ),
        )?;

        let log_level = env_or_default("REFORGE_LOG_LEVEL", "info");
        let json = env_optional("REFORGE_LOG_JSON").map(|value| parse_bool(&value)).unwrap_or(false);
        let prometheus_enabled =
            env_optional("PROMETHEUS_ENABLED").map(|value| parse_bool(&value)).unwrap_or(false);

        let settings = Self {
            server: ServerSettings {
                host: ServerHost::parse(host)?,
                port: ServerPort::parse(port)?,
            },
            runtime: RuntimeSettings { environment, strict_config },
            api: ApiSettings { project_name, version, api_v1_str },
            security: SecuritySettings {
                secret_key,
                access_token_expire_minutes,
                refresh_token_expire_days,
                algorithm,
            },
            cors: CorsSettings { origins: cors_origins },
            database: DatabaseSettings {
                postgres_server,
                postgres_port,
                postgres_user,
                postgres_password,
                postgres_db,
                database_url,
                max_connections,
            },
            redis: RedisSettings {
                host: redis_host,
                port: redis_port,
                db: redis_db,
                password: redis_password,
            },
            admin: AdminSettings { seed_email, seed_password, seed_name },
            practice: PracticeSettings {
                planned_min_easy,
                planned_min_medium,
                planned_min_hard,
                urgent_problems_limit,
            },
            telemetry: TelemetrySettings { log_level, json, prometheus_enabled },
        };

        settings.validate()?;
        Ok(settings)
    }

    pub(crate) fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host.0, self.server.port.0)
    }

    pub(crate) fn server_host(&self) -> &str {
        &self.server.host.0
    }

    pub(crate) fn server_port(&self) -> u16 {
        self.server.port.0
    }

    pub(crate) fn api(&self) -> &ApiSettings {
        &self.api
    }

    pub(crate) fn security(&self) -> &SecuritySettings {
        &self.security
    }

    pub(crate) fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    pub(crate) fn database(&self) -> &DatabaseSettings {
        &self.database
    }

    pub(crate) fn redis(&self) -> &RedisSettings {
        &self.redis
    }

    pub(crate) fn admin(&self) -> &AdminSettings {
        &self.admin
    }

    pub(crate) fn practice(&self) -> &PracticeSettings {
        &self.practice
    }

    pub(crate) fn telemetry(&self) -> &TelemetrySettings {
        &self.telemetry
    }

    pub(crate) fn runtime(&self) -> &RuntimeSettings {
        &self.runtime
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let planned = [
            ("PLANNED_MIN_EASY", self.practice.planned_min_easy),
            ("PLANNED_MIN_MEDIUM", self.practice.planned_min_medium),
            ("PLANNED_MIN_HARD", self.practice.planned_min_hard),
        ];
        for (field, value) in planned {
            if value == 0 {
                return Err(ConfigError::InvalidValue { field, value: value.to_string() });
            }
        }

        if self.practice.urgent_problems_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "URGENT_PROBLEMS_LIMIT",
                value: "0".to_string(),
            });
        }

        if self.security.access_token_expire_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "ACCESS_TOKEN_EXPIRE_MINUTES",
                value: "0".to_string(),
            });
        }

        if !(self.runtime.strict_config || self.runtime.environment.is_production()) {
            return Ok(());
        }

        if self.database.database_url.is_none() && self.database.postgres_password.is_empty() {
            return Err(ConfigError::MissingSecret("POSTGRES_PASSWORD"));
        }
        if !self.admin.seed_email.is_empty() && self.admin.seed_password.is_empty() {
            return Err(ConfigError::MissingSecret("SEED_ADMIN_PASSWORD"));
        }

        Ok(())
    }
}

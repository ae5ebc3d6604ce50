//! Configuração do cliente carregada a partir de `compliai.toml`.
//!
//! A struct [`ClientConfig`] contém a URL base da API, o caminho do arquivo
//! de sessão e as seções `[transport]` e `[polling]`. Valores ausentes no
//! arquivo usam defaults sensíveis. As variáveis de ambiente
//! `COMPLIAI_API_URL` e `COMPLIAI_TOKEN_PATH` têm precedência sobre o arquivo.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ClientError;
use crate::transport::RetryPolicy;

/// Configuração de nível superior carregada de `compliai.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// URL base da API (ex.: `http://localhost:8000/api`).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Arquivo onde o token de sessão é persistido. `None` usa o diretório
    /// de dados local; sem diretório disponível, a sessão fica só em memória.
    #[serde(default)]
    pub token_path: Option<PathBuf>,

    /// Caminho do endpoint de autenticação (isento do header bearer).
    #[serde(default = "default_login_path")]
    pub login_path: String,

    #[serde(default)]
    pub transport: TransportSettings,

    #[serde(default)]
    pub polling: PollingSettings,
}

/// Parâmetros do cliente de transporte.
#[derive(Debug, Clone, Deserialize)]
pub struct TransportSettings {
    /// Prazo padrão para chamadas limitadas, em milissegundos.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Prazo para estabelecer a conexão TCP, em milissegundos.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Total de tentativas por chamada lógica (inclui a primeira).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Passo do backoff linear: a espera após a tentativa `n` é `n * passo`.
    #[serde(default = "default_backoff_step_ms")]
    pub backoff_step_ms: u64,
}

/// Parâmetros do orquestrador de jobs.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingSettings {
    /// Intervalo fixo entre consultas de status, em milissegundos.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Máximo de consultas antes de declarar timeout.
    #[serde(default = "default_poll_attempts")]
    pub max_attempts: u32,

    /// Espera antes de buscar o recurso completo de um job concluído.
    #[serde(default = "default_grace_period_ms")]
    pub grace_period_ms: u64,

    /// Novas leituras permitidas quando o recurso ainda não reflete a conclusão.
    #[serde(default = "default_resolve_retries")]
    pub resolve_retries: u32,

    /// Espera entre leituras de resolução, em milissegundos.
    #[serde(default = "default_resolve_delay_ms")]
    pub resolve_delay_ms: u64,

    /// Progresso estimado inicial no canal de fallback.
    #[serde(default = "default_ramp_baseline")]
    pub ramp_baseline: u8,

    /// Incremento de progresso estimado por tentativa no canal de fallback.
    #[serde(default = "default_ramp_step")]
    pub ramp_step: u8,

    /// Teto do progresso estimado no canal de fallback.
    #[serde(default = "default_ramp_ceiling")]
    pub ramp_ceiling: u8,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_login_path() -> String {
    "/auth/login".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_step_ms() -> u64 {
    1000
}

fn default_interval_ms() -> u64 {
    5000
}

// 120 consultas a cada 5s: teto de ~10 minutos.
fn default_poll_attempts() -> u32 {
    120
}

fn default_grace_period_ms() -> u64 {
    2000
}

fn default_resolve_retries() -> u32 {
    3
}

fn default_resolve_delay_ms() -> u64 {
    1000
}

fn default_ramp_baseline() -> u8 {
    10
}

fn default_ramp_step() -> u8 {
    2
}

fn default_ramp_ceiling() -> u8 {
    90
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_step_ms: default_backoff_step_ms(),
        }
    }
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_poll_attempts(),
            grace_period_ms: default_grace_period_ms(),
            resolve_retries: default_resolve_retries(),
            resolve_delay_ms: default_resolve_delay_ms(),
            ramp_baseline: default_ramp_baseline(),
            ramp_step: default_ramp_step(),
            ramp_ceiling: default_ramp_ceiling(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token_path: None,
            login_path: default_login_path(),
            transport: TransportSettings::default(),
            polling: PollingSettings::default(),
        }
    }
}

impl TransportSettings {
    /// Prazo padrão das chamadas limitadas.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Política de retentativa derivada desta seção.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            backoff_step: Duration::from_millis(self.backoff_step_ms),
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn resolve_delay(&self) -> Duration {
        Duration::from_millis(self.resolve_delay_ms)
    }
}

impl ClientConfig {
    /// Carrega a configuração de `compliai.toml` no diretório atual.
    /// Usa valores padrão se o arquivo não existir.
    pub fn load() -> Result<Self, ClientError> {
        Self::load_from(Path::new("compliai.toml"))
    }

    /// Carrega a configuração de um caminho explícito, aplicando as variáveis de ambiente.
    pub fn load_from(path: &Path) -> Result<Self, ClientError> {
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<ClientConfig>(&contents)?
        } else {
            Self::default()
        };

        // Variáveis de ambiente têm precedência sobre o arquivo.
        if let Ok(url) = std::env::var("COMPLIAI_API_URL") {
            if !url.is_empty() {
                config.base_url = url;
            }
        }
        if let Ok(token_path) = std::env::var("COMPLIAI_TOKEN_PATH") {
            if !token_path.is_empty() {
                config.token_path = Some(PathBuf::from(token_path));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejeita combinações que tornariam o cliente inutilizável.
    pub fn validate(&self) -> Result<(), ClientError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ClientError::Config(format!(
                "base_url must be an http(s) URL, got {:?}",
                self.base_url
            )));
        }
        if self.transport.max_attempts == 0 {
            return Err(ClientError::Config("transport.max_attempts must be at least 1".into()));
        }
        if self.polling.max_attempts == 0 {
            return Err(ClientError::Config("polling.max_attempts must be at least 1".into()));
        }
        if self.polling.ramp_ceiling > 100 {
            return Err(ClientError::Config("polling.ramp_ceiling must be <= 100".into()));
        }
        Ok(())
    }

    /// Caminho efetivo do arquivo de sessão, se houver armazenamento durável disponível.
    pub fn session_path(&self) -> Option<PathBuf> {
        self.token_path
            .clone()
            .or_else(|| dirs::data_local_dir().map(|dir| dir.join("compliai").join("session.json")))
    }
}

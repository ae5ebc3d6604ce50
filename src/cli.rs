//! Interface de linha de comando baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (login, generate,
//! watch, status, list, frameworks, edit, export, delete) e flags globais
//! (--base-url, --max-attempts, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use compliai_client::jobs::{Domain, ExportFormat};

/// Cliente resiliente para a API de geração de políticas e auditorias.
#[derive(Debug, Parser)]
#[command(name = "compliai", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// URL base da API (sobrepõe `compliai.toml` e `COMPLIAI_API_URL`).
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Número máximo de tentativas por chamada.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Serviço de geração alvo, mapeado para [`Domain`] internamente.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DomainArg {
    /// Gerador de políticas.
    Policy,
    /// Planejador de auditorias.
    Audit,
}

impl From<DomainArg> for Domain {
    fn from(arg: DomainArg) -> Self {
        match arg {
            DomainArg::Policy => Domain::PolicyGenerator,
            DomainArg::Audit => Domain::AuditPlanner,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FormatArg {
    Pdf,
    Docx,
    Txt,
}

impl From<FormatArg> for ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Txt => ExportFormat::Txt,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Autentica e guarda o token de sessão.
    Login {
        #[arg(long)]
        email: String,
        /// Senha; se omitida, é lida de `COMPLIAI_PASSWORD`.
        #[arg(long)]
        password: Option<String>,
    },

    /// Descarta o token de sessão local.
    Logout,

    /// Submete um job de geração e aguarda o resultado.
    Generate {
        #[command(subcommand)]
        target: GenerateTarget,

        /// Exporta o artefato para este arquivo ao concluir.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Formato da exportação.
        #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
        format: FormatArg,
    },

    /// Acompanha um job já em execução no servidor.
    Watch {
        #[arg(value_enum)]
        domain: DomainArg,
        project_id: String,
    },

    /// Mostra o projeto completo.
    Status {
        #[arg(value_enum)]
        domain: DomainArg,
        project_id: String,
    },

    /// Lista os projetos do domínio.
    List {
        #[arg(value_enum)]
        domain: DomainArg,
    },

    /// Lista os frameworks de conformidade suportados.
    Frameworks {
        #[arg(value_enum)]
        domain: DomainArg,
    },

    /// Substitui o texto gerado de uma política pelo conteúdo de um arquivo.
    Edit {
        project_id: String,
        /// Arquivo com o novo conteúdo.
        #[arg(long)]
        file: PathBuf,
    },

    /// Baixa o documento gerado.
    Export {
        #[arg(value_enum)]
        domain: DomainArg,
        project_id: String,
        #[arg(long, value_enum, default_value_t = FormatArg::Pdf)]
        format: FormatArg,
        /// Arquivo de saída; padrão `<project_id>.<formato>`.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Omite os metadados do documento.
        #[arg(long, default_value_t = false)]
        no_metadata: bool,
    },

    /// Remove um projeto.
    Delete {
        #[arg(value_enum)]
        domain: DomainArg,
        project_id: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum GenerateTarget {
    /// Gera uma política a partir de um prompt.
    Policy {
        #[arg(long)]
        title: String,
        #[arg(long)]
        framework: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        description: Option<String>,
    },

    /// Gera um plano de auditoria a partir de um documento enviado.
    Audit {
        #[arg(long)]
        title: String,
        #[arg(long)]
        document_id: String,
        #[arg(long)]
        framework: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_generate_policy() {
        let cli = Cli::parse_from([
            "compliai",
            "generate",
            "--export",
            "out.pdf",
            "policy",
            "--title",
            "Access Control",
            "--framework",
            "ISO27001",
            "--prompt",
            "Write an access control policy",
        ]);
        match cli.command {
            Command::Generate {
                target: GenerateTarget::Policy { title, framework, .. },
                export,
                format,
            } => {
                assert_eq!(title, "Access Control");
                assert_eq!(framework, "ISO27001");
                assert_eq!(export, Some(PathBuf::from("out.pdf")));
                assert!(matches!(format, FormatArg::Pdf));
            }
            other => panic!("expected Generate policy, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "compliai",
            "--base-url",
            "https://api.example.com",
            "--max-attempts",
            "5",
            "--verbose",
            "list",
            "audit",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(cli.max_attempts, Some(5));
        assert!(matches!(cli.command, Command::List { domain: DomainArg::Audit }));
    }

    #[test]
    fn cli_parses_export() {
        let cli = Cli::parse_from([
            "compliai", "export", "policy", "p-1", "--format", "docx", "--no-metadata",
        ]);
        match cli.command {
            Command::Export {
                domain,
                project_id,
                format,
                output,
                no_metadata,
            } => {
                assert_eq!(Domain::from(domain), Domain::PolicyGenerator);
                assert_eq!(project_id, "p-1");
                assert_eq!(ExportFormat::from(format), ExportFormat::Docx);
                assert!(output.is_none());
                assert!(no_metadata);
            }
            other => panic!("expected Export, got {other:?}"),
        }
    }

    #[test]
    fn cli_parses_frameworks_and_edit() {
        let cli = Cli::parse_from(["compliai", "frameworks", "audit"]);
        assert!(matches!(cli.command, Command::Frameworks { domain: DomainArg::Audit }));

        let cli = Cli::parse_from(["compliai", "edit", "p-1", "--file", "policy.md"]);
        match cli.command {
            Command::Edit { project_id, file } => {
                assert_eq!(project_id, "p-1");
                assert_eq!(file, PathBuf::from("policy.md"));
            }
            other => panic!("expected Edit, got {other:?}"),
        }
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}

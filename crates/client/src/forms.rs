//! Login, registration and profile-update submitters. Each intercepts
//! one form, validates locally, performs a single request round-trip
//! and reports the outcome through the shared notifier. Navigation is
//! returned to the caller, to be applied after the feedback has had
//! its display time.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use tracing::warn;

use curtidas_core::config::CurtidasConfig;
use curtidas_core::feedback::{FeedbackMessage, Notifier};
use curtidas_core::UserId;

use crate::api::{ApiError, BackendApi};

pub const MSG_CONNECT_ERROR: &str = "Erro ao conectar com o servidor. Tente novamente.";
pub const MSG_PASSWORDS_MISMATCH: &str = "As senhas não coincidem!";
pub const MSG_PASSWORD_INCOMPLETE: &str = "Por favor, preencha a senha corretamente.";
pub const MSG_TOKEN_MISSING: &str = "Erro ao obter o token de acesso. Tente novamente.";

const PASSWORD_FIELD: &str = "senha_hash";
const CONFIRM_FIELD: &str = "confirmar_senha";
const IMAGE_FIELD: &str = "url_imagem_perfil";
const ORG_FIELD: &str = "id_organizacao";
const FILE_FIELD: &str = "file";

const REGISTER_CHECKBOXES: [&str; 6] = [
    "eh_voluntario",
    "eh_gerente",
    "deficiencia_auditiva",
    "usa_cadeira_rodas",
    "deficiencia_cognitiva",
    "lgbtq",
];

const PROFILE_CHECKBOXES: [&str; 7] = [
    "eh_deletado",
    "eh_voluntario",
    "eh_gerente",
    "deficiencia_auditiva",
    "usa_cadeira_rodas",
    "deficiencia_cognitiva",
    "lgbtq",
];

/// A file picked into a form before submission.
#[derive(Debug, Clone)]
pub struct ProfileImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            fields: vec![
                ("username".into(), username.into()),
                ("password".into(), password.into()),
            ],
        }
    }
}

#[derive(Debug, Default)]
pub struct RegisterForm {
    pub fields: BTreeMap<String, String>,
    pub image: Option<ProfileImage>,
}

#[derive(Debug, Default)]
pub struct ProfileForm {
    pub user_id: UserId,
    pub access_token: Option<String>,
    pub fields: BTreeMap<String, String>,
    pub image: Option<ProfileImage>,
}

/// What a submission produced: the banner that was shown and, on
/// success, where to navigate next.
#[derive(Debug, Clone)]
pub struct FormOutcome {
    pub feedback: FeedbackMessage,
    pub redirect: Option<String>,
}

fn success(config: &CurtidasConfig, text: String, redirect: &str) -> FormOutcome {
    FormOutcome {
        feedback: FeedbackMessage::success(text)
            .lasting(Duration::from_millis(config.success_banner_ms)),
        redirect: Some(redirect.to_string()),
    }
}

fn failure(config: &CurtidasConfig, text: impl Into<String>) -> FormOutcome {
    FormOutcome {
        feedback: FeedbackMessage::failure(text)
            .lasting(Duration::from_millis(config.failure_banner_ms)),
        redirect: None,
    }
}

fn deliver(notifier: &Mutex<Notifier>, outcome: FormOutcome) -> FormOutcome {
    notifier.lock().unwrap().show(outcome.feedback.clone());
    outcome
}

pub async fn submit_login(
    api: &dyn BackendApi,
    notifier: &Mutex<Notifier>,
    config: &CurtidasConfig,
    form: LoginForm,
) -> FormOutcome {
    let outcome = match api.login(&form.fields).await {
        Ok(()) => success(
            config,
            "Login realizado com sucesso! Redirecionando...".into(),
            &config.home_redirect,
        ),
        Err(ApiError::Server { status: 401, .. }) => {
            failure(config, "Erro ao fazer login. Credenciais inválidas.")
        }
        Err(ApiError::Server { body, .. }) => failure(
            config,
            format!(
                "Erro ao fazer login. {}",
                body.message
                    .unwrap_or_else(|| "Tente novamente mais tarde.".into())
            ),
        ),
        Err(err) => {
            warn!("login failed: {err}");
            failure(config, MSG_CONNECT_ERROR)
        }
    };
    deliver(notifier, outcome)
}

pub async fn submit_register(
    api: &dyn BackendApi,
    notifier: &Mutex<Notifier>,
    config: &CurtidasConfig,
    mut form: RegisterForm,
) -> FormOutcome {
    if let Some(image) = form.image.take() {
        match api.upload_profile_image(image.filename, image.bytes).await {
            Ok(uploaded) => {
                form.fields.insert(IMAGE_FIELD.into(), uploaded.url);
            }
            Err(err) => {
                warn!("profile image upload failed: {err}");
                return deliver(notifier, failure(config, MSG_CONNECT_ERROR));
            }
        }
    }

    // unticked checkboxes never reach the payload on their own
    for name in REGISTER_CHECKBOXES {
        let value = if form.fields.contains_key(name) {
            "true"
        } else {
            "false"
        };
        form.fields.insert(name.into(), value.into());
    }

    let password = form.fields.get(PASSWORD_FIELD).cloned().unwrap_or_default();
    let confirmation = form.fields.get(CONFIRM_FIELD).cloned().unwrap_or_default();
    if password != confirmation {
        return deliver(notifier, failure(config, MSG_PASSWORDS_MISMATCH));
    }
    form.fields.remove(CONFIRM_FIELD);

    let fields: Vec<(String, String)> = form.fields.into_iter().collect();
    let outcome = match api.register(&fields).await {
        Ok(()) => success(
            config,
            "Conta criada com sucesso! Redirecionando para o login...".into(),
            &config.login_redirect,
        ),
        Err(ApiError::Server { status: 409, body }) => failure(
            config,
            format!(
                "Erro ao criar conta. {}",
                body.detail()
                    .unwrap_or_else(|| "Este usuário já existe.".into())
            ),
        ),
        Err(ApiError::Server { status: 422, .. }) => failure(
            config,
            "Erro ao criar conta. Por favor, verifique os dados informados.",
        ),
        Err(ApiError::Server { body, .. }) => failure(
            config,
            format!(
                "Erro ao criar conta. {}",
                body.detail()
                    .unwrap_or_else(|| "Tente novamente mais tarde.".into())
            ),
        ),
        Err(err) => {
            warn!("registration failed: {err}");
            failure(config, MSG_CONNECT_ERROR)
        }
    };
    deliver(notifier, outcome)
}

pub async fn submit_profile_update(
    api: &dyn BackendApi,
    notifier: &Mutex<Notifier>,
    config: &CurtidasConfig,
    mut form: ProfileForm,
) -> FormOutcome {
    if let Some(image) = form.image.take() {
        match api.upload_profile_image(image.filename, image.bytes).await {
            Ok(uploaded) => {
                form.fields.insert(IMAGE_FIELD.into(), uploaded.url);
            }
            Err(err) => {
                warn!("profile image upload failed: {err}");
                return deliver(notifier, failure(config, MSG_CONNECT_ERROR));
            }
        }
    }

    // the edit form renders every checkbox, so absent means unticked
    for name in PROFILE_CHECKBOXES {
        let ticked = form.fields.get(name).map(|val| val == "true").unwrap_or(false);
        form.fields
            .insert(name.into(), if ticked { "true" } else { "false" }.into());
    }

    let password = form.fields.get(PASSWORD_FIELD).cloned().unwrap_or_default();
    let confirmation = form.fields.get(CONFIRM_FIELD).cloned().unwrap_or_default();
    if !password.is_empty() && password != confirmation {
        return deliver(notifier, failure(config, MSG_PASSWORDS_MISMATCH));
    }
    if password.is_empty() && !confirmation.is_empty() {
        return deliver(notifier, failure(config, MSG_PASSWORD_INCOMPLETE));
    }

    let Some(token) = form.access_token.filter(|token| !token.is_empty()) else {
        return deliver(notifier, failure(config, MSG_TOKEN_MISSING));
    };

    form.fields.remove(CONFIRM_FIELD);
    form.fields.remove(FILE_FIELD);

    let mut body = serde_json::Map::new();
    for (key, value) in form.fields {
        if key == IMAGE_FIELD && value.is_empty() {
            continue;
        }
        if key == ORG_FIELD {
            if let Ok(number) = value.parse::<i64>() {
                body.insert(key, number.into());
                continue;
            }
        }
        body.insert(key, serde_json::Value::String(value));
    }

    let outcome = match api
        .update_profile(form.user_id, &token, serde_json::Value::Object(body))
        .await
    {
        Ok(reply) => success(
            config,
            reply
                .message
                .unwrap_or_else(|| "Perfil atualizado com sucesso!".into()),
            &config.profile_redirect,
        ),
        Err(ApiError::Server { status, body }) => {
            let text = if let Some(msg) = body.first_validation_msg() {
                // pydantic prefixes its value errors; show only the
                // human part
                let human = msg
                    .split("Value error,")
                    .nth(1)
                    .map(str::trim)
                    .unwrap_or(msg);
                format!("Erro ao atualizar perfil. {human}")
            } else if status == 422 {
                "Erro ao atualizar perfil. Por favor, verifique os dados informados.".into()
            } else if status == 409 {
                "Erro ao atualizar perfil. Já existe um usuário com este email ou username.".into()
            } else {
                format!(
                    "Erro ao atualizar perfil. {}",
                    body.detail()
                        .unwrap_or_else(|| "Tente novamente mais tarde.".into())
                )
            };
            failure(config, text)
        }
        Err(err) => {
            warn!("profile update failed: {err}");
            failure(config, MSG_CONNECT_ERROR)
        }
    };
    deliver(notifier, outcome)
}

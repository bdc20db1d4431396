// src/common/i18n.rs

// Catálogo de mensagens exibidas ao usuário (pt é o idioma da oficina).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Pt,
    En,
}

impl Lang {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "en" => Lang::En,
            _ => Lang::Pt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    EmailAlreadyInUse,
    InvalidEmail,
    WeakPassword,
    UserNotFound,
    WrongPassword,
    PasswordMismatch,
    InvalidToken,
    ValidationFailed,
    ProfileNotResolved,
    ScopeUnavailable,
    PermissionRequired,
    AdminOnly,
    PageRestricted,
    SubscriptionInactive,
    NotFound,
    BadRequest,
    Unexpected,
}

impl Message {
    pub fn text(self, lang: Lang) -> &'static str {
        use Message::*;
        match (self, lang) {
            (EmailAlreadyInUse, Lang::Pt) => "Este e-mail já está cadastrado. Tente fazer login.",
            (EmailAlreadyInUse, Lang::En) => "This e-mail is already registered. Try signing in.",
            (InvalidEmail, Lang::Pt) => "Informe um e-mail válido.",
            (InvalidEmail, Lang::En) => "Enter a valid e-mail.",
            (WeakPassword, Lang::Pt) => "A senha precisa ter pelo menos 6 caracteres.",
            (WeakPassword, Lang::En) => "The password must have at least 6 characters.",
            (UserNotFound, Lang::Pt) => "Usuário não encontrado. Verifique o e-mail digitado.",
            (UserNotFound, Lang::En) => "User not found. Check the e-mail you entered.",
            (WrongPassword, Lang::Pt) => "Senha incorreta. Tente novamente.",
            (WrongPassword, Lang::En) => "Wrong password. Try again.",
            (PasswordMismatch, Lang::Pt) => "As senhas informadas não coincidem.",
            (PasswordMismatch, Lang::En) => "The passwords do not match.",
            (InvalidToken, Lang::Pt) => "Sessão inválida ou expirada. Faça login novamente.",
            (InvalidToken, Lang::En) => "Invalid or expired session. Sign in again.",
            (ValidationFailed, Lang::Pt) => "Um ou mais campos são inválidos.",
            (ValidationFailed, Lang::En) => "One or more fields are invalid.",
            (ProfileNotResolved, Lang::Pt) => "Não encontramos um perfil de acesso para esta conta.",
            (ProfileNotResolved, Lang::En) => "No access profile was found for this account.",
            (ScopeUnavailable, Lang::Pt) => "Este acesso não está vinculado a nenhuma oficina.",
            (ScopeUnavailable, Lang::En) => "This account is not linked to any workshop.",
            (PermissionRequired, Lang::Pt) => "Você não tem permissão para acessar esta área.",
            (PermissionRequired, Lang::En) => "You are not allowed to access this area.",
            (AdminOnly, Lang::Pt) => "Ação disponível apenas para o administrador da oficina.",
            (AdminOnly, Lang::En) => "Only the workshop administrator can do this.",
            (PageRestricted, Lang::Pt) => "Esta área não está liberada para o seu acesso.",
            (PageRestricted, Lang::En) => "This area is not enabled for your access.",
            (SubscriptionInactive, Lang::Pt) => {
                "Sua assinatura está inativa. Regularize o plano para continuar usando o sistema."
            }
            (SubscriptionInactive, Lang::En) => {
                "Your subscription is inactive. Renew your plan to keep using the system."
            }
            (NotFound, Lang::Pt) => "Registro não encontrado.",
            (NotFound, Lang::En) => "Record not found.",
            (BadRequest, Lang::Pt) => "Requisição inválida.",
            (BadRequest, Lang::En) => "Invalid request.",
            (Unexpected, Lang::Pt) => {
                "Não foi possível concluir a operação. Tente novamente em instantes."
            }
            (Unexpected, Lang::En) => "The operation could not be completed. Try again shortly.",
        }
    }
}

/// Aviso de redirecionamento quando um técnico abre uma área sem a permissão.
pub fn permission_denied_notice(lang: Lang, label: &str) -> String {
    match lang {
        Lang::Pt => format!("Seu acesso não inclui \"{label}\". Você foi redirecionado ao painel."),
        Lang::En => format!("Your access does not include \"{label}\". You were sent to the dashboard."),
    }
}

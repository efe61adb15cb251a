use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{FieldRules, Rule};

pub const REQUIRED_MESSAGE: &str = "Ce champ est requis";
pub const PASSWORD_MISMATCH_MESSAGE: &str = "Les mots de passe ne correspondent pas";

static EMAIL_RULES: LazyLock<FieldRules> = LazyLock::new(|| {
    FieldRules::new(vec![
        (Rule::Required, REQUIRED_MESSAGE),
        (Rule::Email, "Email invalide"),
    ])
});

static PASSWORD_RULES: LazyLock<FieldRules> = LazyLock::new(|| {
    FieldRules::new(vec![
        (Rule::Required, REQUIRED_MESSAGE),
        (Rule::MinLength(8), "Minimum 8 caractères requis"),
        (Rule::HasUpperCase, "Au moins une majuscule requise"),
        (Rule::HasLowerCase, "Au moins une minuscule requise"),
        (
            Rule::HasSpecialChar,
            "Au moins un caractère spécial requis (!@#$%^&*(),.?\":{}|<>)",
        ),
    ])
});

static USERNAME_RULES: LazyLock<FieldRules> = LazyLock::new(|| {
    FieldRules::new(vec![
        (Rule::Required, REQUIRED_MESSAGE),
        (Rule::MinLength(3), "Minimum 3 caractères requis"),
        (Rule::MaxLength(20), "Maximum 20 caractères autorisés"),
    ])
});

static CONFIRM_PASSWORD_RULES: LazyLock<FieldRules> =
    LazyLock::new(|| FieldRules::new(vec![(Rule::Required, REQUIRED_MESSAGE)]));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Login,
    Signup,
}

impl FormMode {
    /// Fields checked against their rule tables on submit.
    pub fn required_fields(self) -> &'static [Field] {
        match self {
            FormMode::Login => &[Field::Email, Field::Password],
            FormMode::Signup => &[Field::Email, Field::Password, Field::Username],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Email,
    Password,
    Username,
    ConfirmPassword,
}

impl Field {
    pub fn rules(self) -> &'static FieldRules {
        match self {
            Field::Email => &EMAIL_RULES,
            Field::Password => &PASSWORD_RULES,
            Field::Username => &USERNAME_RULES,
            Field::ConfirmPassword => &CONFIRM_PASSWORD_RULES,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Email => "email",
            Field::Password => "password",
            Field::Username => "username",
            Field::ConfirmPassword => "confirmPassword",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current value of one input plus the message it is showing, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldValidationState {
    pub value: String,
    pub error: Option<&'static str>,
}

/// Field-level failures collected on a submit attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<Field, &'static str>);

impl FormErrors {
    pub fn get(&self, field: Field) -> Option<&'static str> {
        self.0.get(&field).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.0.keys().copied()
    }

    fn insert(&mut self, field: Field, message: &'static str) {
        self.0.insert(field, message);
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// State of the login/signup form.
#[derive(Debug, Clone)]
pub struct AuthForm {
    mode: FormMode,
    email: FieldValidationState,
    password: FieldValidationState,
    username: FieldValidationState,
    confirm_password: FieldValidationState,
}

impl AuthForm {
    pub fn new(mode: FormMode) -> Self {
        Self {
            mode,
            email: FieldValidationState::default(),
            password: FieldValidationState::default(),
            username: FieldValidationState::default(),
            confirm_password: FieldValidationState::default(),
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FormMode) {
        self.mode = mode;
    }

    /// Stores a new value and re-validates that field alone.
    pub fn update(&mut self, field: Field, value: impl Into<String>) -> Option<&'static str> {
        let state = self.state_mut(field);
        state.value = value.into();
        state.error = field.rules().validate(&state.value);
        state.error
    }

    pub fn value(&self, field: Field) -> &str {
        &self.state(field).value
    }

    pub fn error(&self, field: Field) -> Option<&'static str> {
        self.state(field).error
    }

    pub fn state(&self, field: Field) -> &FieldValidationState {
        match field {
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::Username => &self.username,
            Field::ConfirmPassword => &self.confirm_password,
        }
    }

    fn state_mut(&mut self, field: Field) -> &mut FieldValidationState {
        match field {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
            Field::Username => &mut self.username,
            Field::ConfirmPassword => &mut self.confirm_password,
        }
    }

    /// Checks every field the current mode requires, replacing all
    /// previously shown messages.
    ///
    /// In signup mode the password confirmation is compared afterwards,
    /// independently of the rule tables.
    pub fn validate_for_submit(&mut self) -> Result<(), FormErrors> {
        let mut errors = FormErrors::default();

        for &field in self.mode.required_fields() {
            if let Some(message) = field.rules().validate(self.value(field)) {
                errors.insert(field, message);
            }
        }

        if self.mode == FormMode::Signup && self.password.value != self.confirm_password.value {
            errors.insert(Field::ConfirmPassword, PASSWORD_MISMATCH_MESSAGE);
        }

        for field in [
            Field::Email,
            Field::Password,
            Field::Username,
            Field::ConfirmPassword,
        ] {
            self.state_mut(field).error = errors.get(field);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Clears every value and message, as after a successful submit.
    pub fn reset(&mut self) {
        *self = Self::new(self.mode);
    }
}

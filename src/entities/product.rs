use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "products")]
#[schema(as = Product)]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Product title, weighted highest in text search
    pub title: String,

    /// Free-form product description
    #[sea_orm(column_type = "Text", nullable)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Product brand
    pub brand: String,

    /// Unit price, never negative
    pub unit_price: f64,

    /// Units in stock, never negative
    pub quantity: i64,

    /// Reference to the product image
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Whether the product is published
    pub active: bool,

    /// Creation timestamp, immutable after insert
    pub created_at: DateTime<Utc>,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.active {
                active_model.active = Set(false);
            }

            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }

            if let ActiveValue::NotSet = active_model.updated_at {
                active_model.updated_at = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}

/// Field order used when reporting violations, so messages are stable.
const FIELD_ORDER: [&str; 7] = [
    "title",
    "description",
    "brand",
    "unit_price",
    "quantity",
    "image",
    "active",
];

/// A single failed field constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Raw, unvalidated product fields.
///
/// Numbers stay as `f64` here so that a fractional quantity coming off the
/// wire can be reported instead of silently truncated.
#[derive(Debug, Clone, Default, PartialEq, Validate)]
pub struct ProductFields {
    #[validate(
        required(message = "title is required"),
        custom = "validate_not_blank"
    )]
    pub title: Option<String>,

    pub description: Option<String>,

    #[validate(
        required(message = "brand is required"),
        custom = "validate_not_blank"
    )]
    pub brand: Option<String>,

    #[validate(
        required(message = "the unit price is required"),
        range(min = 0.0, message = "the unit price cannot be lower than 0")
    )]
    pub unit_price: Option<f64>,

    #[validate(
        required(message = "the quantity is required"),
        range(min = 0.0, message = "the quantity cannot be lower than 0"),
        custom = "validate_integral"
    )]
    pub quantity: Option<f64>,

    pub image: Option<String>,

    pub active: Option<bool>,
}

/// Partial update. `Some(None)` clears a field, `None` leaves it untouched.
///
/// There is deliberately no `created_at` here: it cannot be patched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub title: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub brand: Option<Option<String>>,
    pub unit_price: Option<Option<f64>>,
    pub quantity: Option<Option<f64>>,
    pub image: Option<Option<String>>,
    pub active: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Fields that passed validation, with numeric types narrowed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckedProduct {
    pub title: String,
    pub description: Option<String>,
    pub brand: String,
    pub unit_price: f64,
    pub quantity: i64,
    pub image: Option<String>,
    pub active: bool,
}

impl ProductFields {
    /// Runs every field constraint and returns the violations in field order.
    /// Insert and update both go through here.
    pub fn violations(&self) -> Vec<Violation> {
        match Validate::validate(self) {
            Ok(()) => Vec::new(),
            Err(errors) => collect_violations(&errors),
        }
    }

    /// Overlays a partial update on top of these fields.
    pub fn merge(mut self, patch: ProductPatch) -> Self {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        if let Some(unit_price) = patch.unit_price {
            self.unit_price = unit_price;
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(image) = patch.image {
            self.image = image;
        }
        if let Some(active) = patch.active {
            self.active = Some(active);
        }
        self
    }

    /// Validates and narrows the fields, or returns every violation found.
    pub fn check(self) -> Result<CheckedProduct, Vec<Violation>> {
        let violations = self.violations();
        if !violations.is_empty() {
            return Err(violations);
        }

        match (self.title, self.brand, self.unit_price, self.quantity) {
            (Some(title), Some(brand), Some(unit_price), Some(quantity)) => Ok(CheckedProduct {
                title,
                description: self.description,
                brand,
                unit_price,
                quantity: quantity as i64,
                image: self.image,
                active: self.active.unwrap_or(false),
            }),
            _ => Err(vec![Violation {
                field: "product".to_string(),
                message: "required fields are missing".to_string(),
            }]),
        }
    }
}

impl From<&Model> for ProductFields {
    fn from(model: &Model) -> Self {
        Self {
            title: Some(model.title.clone()),
            description: model.description.clone(),
            brand: Some(model.brand.clone()),
            unit_price: Some(model.unit_price),
            quantity: Some(model.quantity as f64),
            image: model.image.clone(),
            active: Some(model.active),
        }
    }
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("cannot be blank".into());
        return Err(err);
    }
    Ok(())
}

fn validate_integral(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value.fract() != 0.0 {
        let mut err = ValidationError::new("integer");
        err.message = Some(format!("{} is not an integer value", value).into());
        return Err(err);
    }
    // 2^63 is the first f64 outside the stored i64 range
    if value >= i64::MAX as f64 {
        let mut err = ValidationError::new("too_large");
        err.message = Some(format!("{} is too large", value).into());
        return Err(err);
    }
    Ok(())
}

fn collect_violations(errors: &ValidationErrors) -> Vec<Violation> {
    let field_errors = errors.field_errors();
    let mut violations = Vec::new();

    for field in FIELD_ORDER {
        if let Some(list) = field_errors.get(field) {
            for error in list.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                violations.push(Violation {
                    field: field.to_string(),
                    message,
                });
            }
        }
    }

    violations
}

/// Formats violations the way API error messages report them.
pub fn describe_violations(violations: &[Violation]) -> String {
    let details = violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("Product validation failed: {}", details)
}

//! Admin product management: CRUD scoped to the owning user.
//!
//! Forms are multipart because of the image attachment. Validation failures
//! re-render the form with the offending input and a 422, without touching
//! storage; a create without a whitelisted image persists nothing at all.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use tracing::instrument;

use tangelo_core::{ProductId, format_price, parse_price};

use crate::db::products::{NewProduct, ProductRepository, ProductUpdate};
use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Product};
use crate::services::images::{ImageError, UploadedImage};
use crate::state::AppState;

/// Product display data for the admin list.
#[derive(Debug, Clone)]
pub struct AdminProductView {
    pub id: i32,
    pub title: String,
    pub price: String,
    pub image_url: String,
}

impl From<&Product> for AdminProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            title: product.title.clone(),
            price: format_price(product.price),
            image_url: format!("/images/{}", product.image_path),
        }
    }
}

/// The raw form values, echoed back on validation failure.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    pub title: String,
    pub price: String,
    pub description: String,
}

/// Admin product list template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/products.html")]
pub struct AdminProductsTemplate {
    pub products: Vec<AdminProductView>,
    pub logged_in: bool,
}

/// Add/edit product form template.
#[derive(Template, WebTemplate)]
#[template(path = "admin/edit_product.html")]
pub struct EditProductTemplate {
    /// Where the form posts to.
    pub action: String,
    pub editing: bool,
    pub form: ProductFormView,
    pub error_message: Option<String>,
    pub logged_in: bool,
}

/// Own products list.
#[instrument(skip(state, user))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
) -> Result<AdminProductsTemplate> {
    let products = ProductRepository::new(state.pool())
        .list_by_owner(user.id)
        .await?;

    Ok(AdminProductsTemplate {
        products: products.iter().map(AdminProductView::from).collect(),
        logged_in: true,
    })
}

/// Empty add-product form.
#[instrument(skip(_user))]
pub async fn new_form(RequireAuth(_user): RequireAuth) -> EditProductTemplate {
    EditProductTemplate {
        action: "/admin/products".to_owned(),
        editing: false,
        form: ProductFormView::default(),
        error_message: None,
        logged_in: true,
    }
}

/// Create a product. The image attachment is mandatory.
#[instrument(skip(state, user, multipart))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    mut multipart: Multipart,
) -> Result<Response> {
    let form = read_form(&mut multipart).await?;
    let view = form.view();

    let (title, price, description) = match validate(&form) {
        Ok(fields) => fields,
        Err(message) => return Ok(add_form_error(view, message)),
    };

    let Some(image) = form.image else {
        return Ok(add_form_error(view, "Attached file is not an image".to_owned()));
    };

    let image_path = match state.images().save(&image).await {
        Ok(path) => path,
        Err(ImageError::UnsupportedType(_)) => {
            return Ok(add_form_error(view, "Attached file is not an image".to_owned()));
        }
        Err(e) => return Err(e.into()),
    };

    ProductRepository::new(state.pool())
        .insert(NewProduct {
            title,
            price,
            description,
            image_path,
            owner_user_id: user.id,
        })
        .await?;

    tracing::info!(user_id = %user.id, "product created");

    Ok(Redirect::to("/admin/products").into_response())
}

/// Prefilled edit form.
#[instrument(skip(state, user))]
pub async fn edit_form(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Response> {
    let product_id = ProductId::new(id);

    let Some(product) = ProductRepository::new(state.pool())
        .find_by_id(product_id)
        .await?
    else {
        return Ok(Redirect::to("/").into_response());
    };

    owned_product(&product, &user)?;

    let template = EditProductTemplate {
        action: format!("/admin/products/{id}"),
        editing: true,
        form: ProductFormView {
            title: product.title,
            price: product.price.to_string(),
            description: product.description,
        },
        error_message: None,
        logged_in: true,
    };

    Ok(template.into_response())
}

/// Update a product; an attached image replaces the stored one.
#[instrument(skip(state, user, multipart))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Response> {
    let product_id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());

    let existing = repo
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    owned_product(&existing, &user)?;

    let form = read_form(&mut multipart).await?;
    let view = form.view();

    let (title, price, description) = match validate(&form) {
        Ok(fields) => fields,
        Err(message) => return Ok(edit_form_error(id, view, message)),
    };

    // Store the replacement before touching the record; the old asset is
    // removed only once the new one is attached.
    let new_image_path = match form.image {
        Some(image) => match state.images().save(&image).await {
            Ok(path) => Some(path),
            Err(ImageError::UnsupportedType(_)) => {
                return Ok(edit_form_error(
                    id,
                    view,
                    "Attached file is not an image".to_owned(),
                ));
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    repo.update(
        product_id,
        user.id,
        ProductUpdate {
            title,
            price,
            description,
            image_path: new_image_path.clone(),
        },
    )
    .await?;

    if new_image_path.is_some()
        && let Err(e) = state.images().remove(&existing.image_path).await
    {
        tracing::warn!(
            image = %existing.image_path,
            error = %e,
            "failed to delete replaced product image"
        );
    }

    tracing::info!(user_id = %user.id, %product_id, "product updated");

    Ok(Redirect::to("/admin/products").into_response())
}

/// Delete a product and its image.
#[instrument(skip(state, user))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Redirect> {
    let product_id = ProductId::new(id);
    let repo = ProductRepository::new(state.pool());

    let product = repo
        .find_by_id(product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
    owned_product(&product, &user)?;

    // Image removal is best-effort; a stuck file never blocks the record
    // delete. Order snapshots keep their copies either way.
    if let Err(e) = state.images().remove(&product.image_path).await {
        tracing::warn!(
            image = %product.image_path,
            error = %e,
            "failed to delete product image"
        );
    }

    repo.delete(product_id, user.id).await?;

    tracing::info!(user_id = %user.id, %product_id, "product deleted");

    Ok(Redirect::to("/admin/products"))
}

/// Reject anyone but the product's owner.
fn owned_product(product: &Product, user: &CurrentUser) -> Result<()> {
    if product.owner_user_id == user.id {
        Ok(())
    } else {
        Err(AppError::Unauthorized(format!("product {}", product.id)))
    }
}

// =============================================================================
// Form handling
// =============================================================================

/// The parsed multipart product form.
#[derive(Debug, Default)]
struct ProductForm {
    title: String,
    price: String,
    description: String,
    image: Option<UploadedImage>,
}

impl ProductForm {
    fn view(&self) -> ProductFormView {
        ProductFormView {
            title: self.title.clone(),
            price: self.price.clone(),
            description: self.description.clone(),
        }
    }
}

/// Read the multipart fields into a [`ProductForm`].
async fn read_form(multipart: &mut Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid form data: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "title" => form.title = read_text(field).await?,
            "price" => form.price = read_text(field).await?,
            "description" => form.description = read_text(field).await?,
            "image" => {
                let original_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("invalid upload: {e}")))?;

                // Browsers submit an empty file part when nothing was picked
                if !original_name.is_empty() && !bytes.is_empty() {
                    form.image = Some(UploadedImage {
                        original_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("invalid form data: {e}")))
}

/// Validate the text fields, returning them cleaned up.
fn validate(form: &ProductForm) -> std::result::Result<(String, Decimal, String), String> {
    let title = form.title.trim();
    if title.is_empty() {
        return Err("Title is required".to_owned());
    }

    let price = parse_price(&form.price).map_err(|e| e.to_string())?;

    let description = form.description.trim();
    if description.is_empty() {
        return Err("Description is required".to_owned());
    }

    Ok((title.to_owned(), price, description.to_owned()))
}

fn add_form_error(form: ProductFormView, message: String) -> Response {
    form_error("/admin/products".to_owned(), false, form, message)
}

fn edit_form_error(id: i32, form: ProductFormView, message: String) -> Response {
    form_error(format!("/admin/products/{id}"), true, form, message)
}

/// Re-render the form with the offending input and a 422.
fn form_error(action: String, editing: bool, form: ProductFormView, message: String) -> Response {
    let template = EditProductTemplate {
        action,
        editing,
        form,
        error_message: Some(message),
        logged_in: true,
    };

    (StatusCode::UNPROCESSABLE_ENTITY, template).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, price: &str, description: &str) -> ProductForm {
        ProductForm {
            title: title.to_owned(),
            price: price.to_owned(),
            description: description.to_owned(),
            image: None,
        }
    }

    #[test]
    fn test_validate_accepts_clean_form() {
        let (title, price, description) =
            validate(&form(" Tangelo Crate ", "19.99", "A crate of tangelos")).expect("valid");
        assert_eq!(title, "Tangelo Crate");
        assert_eq!(price.to_string(), "19.99");
        assert_eq!(description, "A crate of tangelos");
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        assert!(validate(&form("  ", "19.99", "desc")).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_price() {
        assert!(validate(&form("t", "free", "desc")).is_err());
        assert!(validate(&form("t", "0", "desc")).is_err());
        assert!(validate(&form("t", "-2", "desc")).is_err());
    }

    #[test]
    fn test_validate_rejects_blank_description() {
        assert!(validate(&form("t", "1.00", "   ")).is_err());
    }
}

//! `hk cart` commands.

use headless_kit_core::{GID_PREFIX, VariantId};
use headless_kit_storefront::cart::{FetchedCart, MutationOutcome};
use headless_kit_storefront::error::Result;
use headless_kit_storefront::shopify::Cart as ShopifyCart;

use super::Cart;

/// Accept a full variant gid or a bare numeric id.
fn variant_id(raw: &str) -> VariantId {
    let raw = raw.trim();
    if raw.starts_with(GID_PREFIX) {
        VariantId::new(raw)
    } else {
        VariantId::new(format!("{GID_PREFIX}ProductVariant/{raw}"))
    }
}

/// Identifier for update and remove: a gid is kept, a bare number is taken
/// as a variant id like in `add`, anything else is passed through.
fn line_ref(raw: &str) -> String {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        variant_id(raw).into_inner()
    } else {
        raw.to_string()
    }
}

/// Load the current cart, failing if it cannot be fetched.
async fn load(cart: &Cart) -> Result<Option<ShopifyCart>> {
    match cart.refresh().await {
        FetchedCart::Cart(current) => Ok(Some(current)),
        FetchedCart::NoCart => Ok(None),
        FetchedCart::Unknown(e) => Err(e.into()),
    }
}

fn applied(outcome: MutationOutcome) -> Result<Option<ShopifyCart>> {
    match outcome {
        MutationOutcome::Applied(current) => Ok(Some(current)),
        MutationOutcome::Failed(e) => Err(e.into()),
        MutationOutcome::Skipped => Ok(None),
    }
}

#[allow(clippy::print_stdout)]
pub fn print_cart(cart: &ShopifyCart) {
    println!("Cart {}", cart.id);

    match cart.lines.as_deref() {
        None => println!("  (line data unavailable)"),
        Some([]) => println!("  (empty)"),
        Some(lines) => {
            for line in lines {
                println!(
                    "  {} x {} - {}  {}",
                    line.quantity,
                    line.merchandise.product.title,
                    line.merchandise.title,
                    line.total.display()
                );
                println!("      line {}  variant {}", line.id, line.merchandise.id);
            }
        }
    }

    if let Some(cost) = &cart.cost {
        println!("Subtotal: {}", cost.subtotal.display());
        println!("Total:    {}", cost.total.display());
    }
    println!("Checkout: {}", cart.checkout_url);
}

#[allow(clippy::print_stdout)]
fn print_outcome(current: Option<&ShopifyCart>) {
    match current {
        Some(current) => print_cart(current),
        None => println!("No cart yet, nothing to change."),
    }
}

#[allow(clippy::print_stdout)]
pub async fn show(cart: &Cart) -> Result<()> {
    match load(cart).await? {
        Some(current) => print_cart(&current),
        None => println!("No cart yet."),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn count(cart: &Cart) -> Result<()> {
    load(cart).await?;
    match cart.item_count() {
        Some(n) => println!("{n}"),
        None => println!("unknown"),
    }
    Ok(())
}

pub async fn create(cart: &Cart) -> Result<()> {
    let created = applied(cart.create_cart().await)?;
    print_outcome(created.as_ref());
    Ok(())
}

pub async fn add(cart: &Cart, variant: &str, quantity: i64) -> Result<()> {
    let current = applied(cart.add_line_item(&variant_id(variant), quantity).await)?;
    print_outcome(current.as_ref());
    Ok(())
}

pub async fn update(cart: &Cart, line: &str, quantity: i64) -> Result<()> {
    // Loaded so variant ids can be mapped to their lines
    load(cart).await?;
    let current = applied(cart.update_line_item(&line_ref(line), quantity).await)?;
    print_outcome(current.as_ref());
    Ok(())
}

pub async fn remove(cart: &Cart, line: &str) -> Result<()> {
    load(cart).await?;
    let current = applied(cart.remove_line_item(&line_ref(line)).await)?;
    print_outcome(current.as_ref());
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn open(cart: &Cart) -> Result<()> {
    match load(cart).await? {
        Some(current) => println!("{}", current.checkout_url),
        None => println!("No cart yet."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_id_accepts_numeric() {
        assert_eq!(
            variant_id("123").as_str(),
            "gid://shopify/ProductVariant/123"
        );
        assert_eq!(
            variant_id(" gid://shopify/ProductVariant/9 ").as_str(),
            "gid://shopify/ProductVariant/9"
        );
    }

    #[test]
    fn test_line_ref_expands_numeric_ids() {
        assert_eq!(line_ref(" 123 "), "gid://shopify/ProductVariant/123");
        assert_eq!(
            line_ref("gid://shopify/CartLine/abc"),
            "gid://shopify/CartLine/abc"
        );
        assert_eq!(line_ref("line-7"), "line-7");
    }
}

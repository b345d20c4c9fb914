//! `hk product` command.

use headless_kit_storefront::error::Result;
use headless_kit_storefront::product::{AddToBagOptions, AddToBagState, ProductHelper};

use super::{cart::print_cart, connect};

/// Add-to-cart options from the command line.
pub struct AddArgs {
    pub quantity: i64,
    pub open: bool,
}

#[allow(clippy::print_stdout)]
fn print_product(helper: &ProductHelper) {
    let product = helper.product();
    println!("{} ({})", product.title, product.handle);

    for option in helper.options() {
        let values: Vec<String> = option
            .values
            .iter()
            .map(|v| {
                let selected = helper.selection().get(&option.name) == Some(v.value.as_str());
                match (selected, v.not_available) {
                    (true, _) => format!("[{}]", v.value),
                    (false, true) => format!("{} (sold out)", v.value),
                    (false, false) => v.value.clone(),
                }
            })
            .collect();
        println!("  {}: {}", option.name, values.join(", "));
    }

    match helper.selected_variant() {
        Some(variant) => {
            let price = variant
                .price
                .as_ref()
                .map_or_else(String::new, |p| format!("  {}", p.display()));
            let stock = if variant.is_purchasable() { "" } else { "  (sold out)" };
            println!("Variant: {} {}{price}{stock}", variant.title, variant.id);
        }
        None => println!("Variant: no match for this selection"),
    }
}

#[allow(clippy::print_stdout)]
pub async fn show(handle: &str, selections: &[(String, String)], add: Option<AddArgs>) -> Result<()> {
    let (client, cart) = connect()?;
    let product = client.get_product_by_handle(handle).await?;

    let mut helper = ProductHelper::new(product);
    for (name, value) in selections {
        helper.select_option(name, Some(value.as_str()))?;
    }
    print_product(&helper);

    let Some(add) = add else {
        return Ok(());
    };

    if !helper.can_add_to_bag() {
        let progress = helper.progress();
        if progress.has_all_selected {
            println!("No variant matches this selection.");
        } else {
            println!("Select a value for every option before adding to the cart.");
        }
        return Ok(());
    }

    helper
        .add_to_bag(
            &cart,
            AddToBagOptions {
                quantity: add.quantity,
                open_cart_on_success: add.open,
            },
        )
        .await;

    match helper.add_to_bag_state() {
        AddToBagState::Error(e) => return Err(e.into()),
        AddToBagState::Success => {
            let state = cart.state();
            if state.is_open
                && let Some(current) = state.cart.cart()
            {
                print_cart(current);
            } else if let Some(n) = state.item_count() {
                println!("Added. Cart now holds {n} item(s).");
            } else {
                println!("Added.");
            }
        }
        AddToBagState::Idle | AddToBagState::Loading => {}
    }
    Ok(())
}

//! # Interactive Menu
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  === Discount Management ===                │
//! │  1. Create fixed-amount coupon              │
//! │  2. Create percentage discount              │
//! │  3. Apply discount to a cart                │
//! │  4. Check a coupon code                     │
//! │  5. List discounts                          │
//! │  6. Delete a discount                       │
//! │  0. Exit                                    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every action reads its answers through a [`Prompter`], so the whole menu
//! can be driven from a scripted buffer. Domain errors are printed and the
//! loop continues; only terminal and storage failures end the session.

use std::io::{BufRead, Write};

use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;
use voucher_core::use_cases::{
    CommonTermsInput, CreateFixedDiscount, CreateFixedDiscountInput, CreatePercentageDiscount,
    CreatePercentageDiscountInput,
};
use voucher_core::validation::{parse_decimal, validate_currency};
use voucher_core::{Cart, CoreError, Discount, DiscountService, Money};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::prompt::Prompter;

pub struct Menu {
    service: DiscountService,
    config: CliConfig,
}

impl Menu {
    pub fn new(service: DiscountService, config: CliConfig) -> Self {
        Menu { service, config }
    }

    /// Runs until the user picks `0` or the input closes.
    pub async fn run<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        loop {
            print_options(p)?;

            let choice = match p.ask("Choose an option") {
                Ok(choice) => choice,
                Err(CliError::InputClosed) => break,
                Err(err) => return Err(err),
            };

            let outcome = match choice.as_str() {
                "1" => self.create_fixed(p).await,
                "2" => self.create_percentage(p).await,
                "3" => self.apply_to_cart(p).await,
                "4" => self.check_coupon(p).await,
                "5" => self.list(p).await,
                "6" => self.delete(p).await,
                "0" => break,
                other => Err(CliError::invalid_input(format!("Unknown option '{other}'"))),
            };

            match outcome {
                Ok(()) => {}
                Err(CliError::InputClosed) => break,
                Err(CliError::Core(err)) => {
                    if !err.is_user_error() {
                        warn!(error = %err, "Menu action failed");
                    }
                    p.say(format!("Error: {err}"))?;
                }
                Err(CliError::InvalidInput(message)) => p.say(format!("Error: {message}"))?,
                Err(err) => return Err(err),
            }
        }

        p.say("Bye.")
    }

    // -------------------------------------------------------------------------
    // 1. Fixed-amount coupon
    // -------------------------------------------------------------------------

    async fn create_fixed<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        p.say("--- New fixed-amount coupon ---")?;

        let code = required(p, "Coupon code")?;
        let amount = required(p, "Discount amount")?;
        let currency = self.ask_currency(p)?;
        let terms = self.ask_common_terms(p)?;

        p.say(format!(
            "Coupon {code}: {amount} {currency} off, {}",
            describe_terms(&terms)
        ))?;
        if !p.confirm("Create this discount?")? {
            return p.say("Cancelled.");
        }

        let discount = CreateFixedDiscount::new(&self.service)
            .execute(CreateFixedDiscountInput {
                amount,
                code,
                currency,
                terms,
            })
            .await?;

        print_created(p, &discount)
    }

    // -------------------------------------------------------------------------
    // 2. Percentage discount
    // -------------------------------------------------------------------------

    async fn create_percentage<R: BufRead, W: Write>(
        &self,
        p: &mut Prompter<R, W>,
    ) -> CliResult<()> {
        p.say("--- New percentage discount ---")?;

        let percentage = required(p, "Percentage (0-100]")?;
        let code = optional(p, "Code (blank for none)")?;
        let currency = self.ask_currency(p)?;
        let maximum_discount_amount = optional(p, "Maximum discount amount (blank for no cap)")?;
        let terms = self.ask_common_terms(p)?;

        p.say(format!(
            "{percentage}% off, code {}, cap {}, {}",
            code.as_deref().unwrap_or("none"),
            maximum_discount_amount.as_deref().unwrap_or("none"),
            describe_terms(&terms)
        ))?;
        if !p.confirm("Create this discount?")? {
            return p.say("Cancelled.");
        }

        let discount = CreatePercentageDiscount::new(&self.service)
            .execute(CreatePercentageDiscountInput {
                percentage,
                code,
                currency,
                maximum_discount_amount,
                terms,
            })
            .await?;

        print_created(p, &discount)
    }

    // -------------------------------------------------------------------------
    // 3. Redemption
    // -------------------------------------------------------------------------

    async fn apply_to_cart<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        let key = required(p, "Discount id or code")?;
        let currency = self.ask_currency(p)?;

        let total = match optional(p, "Cart total (blank to enter items)")? {
            Some(raw) => parse_money("cart total", &raw, &currency)?,
            None => read_cart(p, &currency)?,
        };

        let final_total = match Uuid::parse_str(&key) {
            Ok(id) => self.service.apply_discount_to_cart(&total, id).await?,
            Err(_) => self.service.apply_code_to_cart(&total, &key).await?,
        };
        let saved = total.subtract(&final_total)?;

        p.say(format!("Original total: {total}"))?;
        p.say(format!("You saved:      {saved}"))?;
        p.say(format!("Final total:    {final_total}"))
    }

    // -------------------------------------------------------------------------
    // 4. Coupon check
    // -------------------------------------------------------------------------

    async fn check_coupon<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        let code = required(p, "Coupon code")?;
        let currency = self.ask_currency(p)?;
        let order_value = parse_money("order value", &required(p, "Order value")?, &currency)?;

        let Some(preview) = self.service.preview_discount(&code, &order_value).await? else {
            return p.say(format!("Coupon {code} is not valid for this order."));
        };

        p.say(format!(
            "Coupon {code} is valid: {}",
            preview.discount.description
        ))?;
        p.say(format!("Discount:    {}", preview.discount_amount))?;
        p.say(format!("Final total: {}", preview.final_total))?;
        match preview.remaining_uses {
            Some(remaining) => p.say(format!("Remaining uses: {remaining}")),
            None => p.say("Remaining uses: unlimited"),
        }
    }

    // -------------------------------------------------------------------------
    // 5. Listing
    // -------------------------------------------------------------------------

    async fn list<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        let discounts = self.service.list_discounts().await?;
        if discounts.is_empty() {
            return p.say("No discounts registered.");
        }

        let now = self.service.now();
        for discount in &discounts {
            let usage = match discount.max_usage_count {
                Some(max) => format!("{}/{}", discount.current_usage_count, max),
                None => format!("{}/unlimited", discount.current_usage_count),
            };
            p.say(format!(
                "{}  {:<12} {:>12}  {:<15} {:<9} {}",
                discount.id,
                discount.discount_type.as_str(),
                discount.value_label(),
                discount.code.as_deref().unwrap_or("-"),
                discount.status_at(now).to_string(),
                usage
            ))?;
        }
        p.say(format!("{} discount(s).", discounts.len()))
    }

    // -------------------------------------------------------------------------
    // 6. Deletion
    // -------------------------------------------------------------------------

    async fn delete<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<()> {
        let raw = required(p, "Discount id")?;
        let id = Uuid::parse_str(&raw)
            .map_err(|_| CliError::invalid_input(format!("'{raw}' is not a discount id")))?;

        let discount = self.service.get_discount(id).await?;
        p.say(format!(
            "{} {} ({})",
            discount.discount_type,
            discount.value_label(),
            discount.code.as_deref().unwrap_or("no code")
        ))?;
        if !p.confirm("Delete this discount?")? {
            return p.say("Cancelled.");
        }

        self.service.delete_discount(id).await?;
        p.say("Discount deleted.")
    }

    // -------------------------------------------------------------------------
    // Shared prompts
    // -------------------------------------------------------------------------

    fn ask_currency<R: BufRead, W: Write>(&self, p: &mut Prompter<R, W>) -> CliResult<String> {
        let raw = p.ask_with_default("Currency", &self.config.default_currency)?;
        Ok(validate_currency(&raw).map_err(CoreError::from)?)
    }

    fn ask_common_terms<R: BufRead, W: Write>(
        &self,
        p: &mut Prompter<R, W>,
    ) -> CliResult<CommonTermsInput> {
        let description = p.ask("Description (blank for automatic)")?;
        let minimum_order_value = optional(p, "Minimum order value (blank for none)")?;

        let days = p.ask_with_default(
            "Validity in days (0 for no expiry)",
            &self.config.default_validity_days.to_string(),
        )?;
        let validity_days = match parse_count("validity", &days)? {
            0 => None,
            days => Some(days),
        };

        let max_usage_count = match optional(p, "Maximum uses (blank for unlimited)")? {
            Some(raw) => Some(parse_count("maximum uses", &raw)?),
            None => None,
        };

        Ok(CommonTermsInput {
            description,
            minimum_order_value,
            validity_days,
            max_usage_count,
        })
    }
}

fn print_options<R: BufRead, W: Write>(p: &mut Prompter<R, W>) -> CliResult<()> {
    p.say("")?;
    p.say("=== Discount Management ===")?;
    p.say("1. Create fixed-amount coupon")?;
    p.say("2. Create percentage discount")?;
    p.say("3. Apply discount to a cart")?;
    p.say("4. Check a coupon code")?;
    p.say("5. List discounts")?;
    p.say("6. Delete a discount")?;
    p.say("0. Exit")
}

fn print_created<R: BufRead, W: Write>(p: &mut Prompter<R, W>, discount: &Discount) -> CliResult<()> {
    p.say(format!(
        "Created {} discount {} ({})",
        discount.discount_type,
        discount.id,
        discount.value_label()
    ))
}

fn describe_terms(terms: &CommonTermsInput) -> String {
    let minimum = terms.minimum_order_value.as_deref().unwrap_or("none");
    let validity = match terms.validity_days {
        Some(days) => format!("{days} day(s)"),
        None => "no expiry".to_string(),
    };
    let uses = match terms.max_usage_count {
        Some(max) => max.to_string(),
        None => "unlimited".to_string(),
    };
    format!("minimum {minimum}, validity {validity}, uses {uses}")
}

/// Reads `product qty price` lines until a blank one. Malformed lines are
/// reported and skipped.
fn read_cart<R: BufRead, W: Write>(p: &mut Prompter<R, W>, currency: &str) -> CliResult<Money> {
    let mut cart = Cart::new(currency);

    loop {
        let line = p.ask("Item (product qty price, blank to finish)")?;
        if line.is_empty() {
            break;
        }

        let added = parse_item(&line, currency)
            .and_then(|(product, qty, price)| {
                cart.add_item(product, qty, price).map_err(CliError::from)
            });
        if let Err(err) = added {
            p.say(format!("Error: {err}"))?;
        }
    }

    if cart.is_empty() {
        return Err(CliError::invalid_input("The cart is empty"));
    }
    Ok(cart.total()?)
}

fn parse_item(line: &str, currency: &str) -> CliResult<(String, u32, Money)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let [product, qty, price] = parts.as_slice() else {
        return Err(CliError::invalid_input(
            "Expected: <product> <quantity> <unit price>",
        ));
    };

    let qty = parse_count("quantity", qty)?;
    let price = parse_money("unit price", price, currency)?;
    Ok((product.to_string(), qty, price))
}

fn required<R: BufRead, W: Write>(p: &mut Prompter<R, W>, label: &str) -> CliResult<String> {
    let answer = p.ask(label)?;
    if answer.is_empty() {
        return Err(CliError::invalid_input(format!("{label} is required")));
    }
    Ok(answer)
}

fn optional<R: BufRead, W: Write>(
    p: &mut Prompter<R, W>,
    label: &str,
) -> CliResult<Option<String>> {
    let answer = p.ask(label)?;
    Ok(if answer.is_empty() { None } else { Some(answer) })
}

fn parse_money(field: &str, raw: &str, currency: &str) -> CliResult<Money> {
    let amount: Decimal = parse_decimal(field, raw).map_err(CoreError::from)?;
    Ok(Money::new(amount, currency)?)
}

fn parse_count(field: &str, raw: &str) -> CliResult<u32> {
    raw.trim()
        .parse()
        .map_err(|_| CliError::invalid_input(format!("{field} must be a whole number, got '{raw}'")))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;
    use std::io::Cursor;
    use std::sync::Arc;
    use voucher_core::{FixedClock, InMemoryDiscountStore};

    fn start() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn menu() -> Menu {
        let service = DiscountService::new(
            Arc::new(InMemoryDiscountStore::new()),
            Arc::new(FixedClock::new(start())),
        );
        Menu::new(service, CliConfig::in_memory())
    }

    async fn run_script(menu: &Menu, script: &str) -> String {
        let mut p = Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new());
        menu.run(&mut p).await.unwrap();
        String::from_utf8(p.into_output()).unwrap()
    }

    // code, amount, currency, description, minimum, validity, max uses, confirm
    const CREATE_SAVE15: &str = "1\nSAVE15\n15.50\n\n\n100\n\n2\ns\n";

    #[tokio::test]
    async fn test_create_fixed_coupon_and_redeem_by_code() {
        let menu = menu();
        let script = format!("{CREATE_SAVE15}3\nSAVE15\n\n200\n0\n");
        let output = run_script(&menu, &script).await;

        assert!(output.contains("Created FIXED_AMOUNT discount"));
        assert!(output.contains("Original total: R$ 200.00"));
        assert!(output.contains("You saved:      R$ 15.50"));
        assert!(output.contains("Final total:    R$ 184.50"));
        assert!(output.ends_with("Bye.\n"));

        let stored = menu.service.find_by_code("SAVE15").await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, 1);
        assert_eq!(stored.max_usage_count, Some(2));
        assert_eq!(stored.minimum_order_value.amount(), dec!(100));
        assert_eq!(stored.description, "Discount of R$ 15.50");
    }

    #[tokio::test]
    async fn test_redemption_below_minimum_is_reported() {
        let menu = menu();
        let script = format!("{CREATE_SAVE15}3\nSAVE15\n\n50\n0\n");
        let output = run_script(&menu, &script).await;

        assert!(output.contains("cannot be applied: order value below minimum of R$ 100.00"));
        let stored = menu.service.find_by_code("SAVE15").await.unwrap().unwrap();
        assert_eq!(stored.current_usage_count, 0);
    }

    #[tokio::test]
    async fn test_percentage_by_id_with_item_entry() {
        let menu = menu();
        // percentage, code, currency, cap, description, minimum, validity, uses, confirm
        run_script(&menu, "2\n10\n\n\n\n\n\n0\n\ny\n").await;

        let discounts = menu.service.list_discounts().await.unwrap();
        assert_eq!(discounts.len(), 1);
        let discount = &discounts[0];
        assert_eq!(discount.code, None);
        assert_eq!(discount.valid_until, None);
        assert_eq!(discount.description, "10% off");

        let script = format!(
            "3\n{}\n\n\ncoffee 2 10.00\nbroken line\ncake 1 30\n\n0\n",
            discount.id
        );
        let output = run_script(&menu, &script).await;

        assert!(output.contains("Error: Expected: <product> <quantity> <unit price>"));
        assert!(output.contains("Original total: R$ 50.00"));
        assert!(output.contains("Final total:    R$ 45.00"));
    }

    #[tokio::test]
    async fn test_cancelled_creation_persists_nothing() {
        let menu = menu();
        let output = run_script(&menu, "1\nNOPE\n5\n\n\n\n\n\nn\n0\n").await;

        assert!(output.contains("Cancelled."));
        assert!(menu.service.list_discounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_input_errors_keep_menu_running() {
        let menu = menu();
        let script = "9\n1\n\n1\nBAD\n0\n\n\n\n\n\ns\n5\n0\n";
        let output = run_script(&menu, script).await;

        assert!(output.contains("Error: Unknown option '9'"));
        assert!(output.contains("Error: Coupon code is required"));
        assert!(output.contains("Error: Invalid argument"));
        assert!(output.contains("No discounts registered."));
    }

    #[tokio::test]
    async fn test_check_list_and_delete() {
        let menu = menu();
        run_script(&menu, CREATE_SAVE15).await;
        let id = menu.service.find_by_code("SAVE15").await.unwrap().unwrap().id;

        let output = run_script(&menu, "4\nSAVE15\n\n120\n4\nSAVE15\n\n80\n5\n0\n").await;
        assert!(output.contains("Coupon SAVE15 is valid: Discount of R$ 15.50"));
        assert!(output.contains("Final total: R$ 104.50"));
        assert!(output.contains("Remaining uses: 2"));
        assert!(output.contains("Coupon SAVE15 is not valid for this order."));
        assert!(output.contains("FIXED_AMOUNT"));
        assert!(output.contains("0/2"));
        assert!(output.contains("1 discount(s)."));

        let output = run_script(&menu, &format!("6\n{id}\ns\n6\nnot-an-id\n0\n")).await;
        assert!(output.contains("Discount deleted."));
        assert!(output.contains("Error: 'not-an-id' is not a discount id"));
        assert!(menu.service.list_discounts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eof_exits_cleanly() {
        let menu = menu();
        let output = run_script(&menu, "1\nHALF").await;
        assert!(output.ends_with("Bye.\n"));
    }
}

use rust_decimal::Decimal;

/// Buyer classification carried in the JWT role claim.
/// `cliente` buys retail, `mayorista` buys wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyerClass {
    Retail,
    Wholesale,
}

impl BuyerClass {
    pub fn from_role(role: &str) -> Self {
        match role {
            "mayorista" => BuyerClass::Wholesale,
            _ => BuyerClass::Retail,
        }
    }
}

/// Unit price for a product line.
///
/// Whenever a discount percentage is set it applies to every buyer class;
/// wholesale buyers currently get the same discounted price as retail ones.
/// The result is exact; rounding to 2 decimals happens when totals are
/// computed, not per unit.
pub fn unit_price(price: Decimal, discount_percentage: Decimal, _buyer_class: BuyerClass) -> Decimal {
    if discount_percentage > Decimal::ZERO {
        price - price * discount_percentage / Decimal::ONE_HUNDRED
    } else {
        price
    }
}

/// Line total before rounding.
pub fn line_total(unit: Decimal, quantity: i32) -> Decimal {
    unit * Decimal::from(quantity)
}

/// Round a monetary total to 2 decimal places.
pub fn round_total(amount: Decimal) -> Decimal {
    amount.round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    #[test]
    fn no_discount_returns_base_price() {
        let price = dec("50000");
        let unit = unit_price(price, Decimal::ZERO, BuyerClass::Retail);
        assert_eq!(unit, price);
    }

    #[test]
    fn discount_applies_percentage() {
        let unit = unit_price(dec("80000"), dec("20"), BuyerClass::Retail);
        assert_eq!(unit, dec("64000"));
    }

    #[test]
    fn wholesale_gets_same_discounted_price_as_retail() {
        let retail = unit_price(dec("80000"), dec("20"), BuyerClass::Retail);
        let wholesale = unit_price(dec("80000"), dec("20"), BuyerClass::Wholesale);
        assert_eq!(retail, wholesale);
    }

    #[test]
    fn totals_round_to_two_decimals() {
        // 5% off 9.99 leaves four decimals per unit; the total gets clamped.
        let unit = unit_price(dec("9.99"), dec("5"), BuyerClass::Retail);
        assert_eq!(unit, dec("9.4905"));
        let total = round_total(line_total(unit, 2));
        assert_eq!(total, dec("18.98"));
    }

    #[test]
    fn buyer_class_from_role() {
        assert_eq!(BuyerClass::from_role("mayorista"), BuyerClass::Wholesale);
        assert_eq!(BuyerClass::from_role("cliente"), BuyerClass::Retail);
        assert_eq!(BuyerClass::from_role("admin"), BuyerClass::Retail);
    }
}

//! Drawer texts per language.

use minicart_core::Locale;

/// Fixed texts shown by the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawerLabels {
    pub title: &'static str,
    pub empty: &'static str,
    pub continue_shopping: &'static str,
    pub subtotal: &'static str,
    pub total: &'static str,
    pub coupon: &'static str,
    pub checkout: &'static str,
    pub remove: &'static str,
    pub quantity: &'static str,
    pub free: &'static str,
    pub free_shipping_reached: &'static str,
    /// Followed by the formatted remaining amount.
    pub free_shipping_missing: &'static str,
}

const PORTUGUESE: DrawerLabels = DrawerLabels {
    title: "Seu carrinho",
    empty: "Seu carrinho está vazio",
    continue_shopping: "Continuar comprando",
    subtotal: "Subtotal",
    total: "Total",
    coupon: "Cupom de desconto",
    checkout: "Finalizar compra",
    remove: "Remover",
    quantity: "Quantidade",
    free: "Grátis",
    free_shipping_reached: "Você ganhou frete grátis!",
    free_shipping_missing: "Faltam para frete grátis:",
};

const ENGLISH: DrawerLabels = DrawerLabels {
    title: "Your cart",
    empty: "Your cart is empty",
    continue_shopping: "Continue shopping",
    subtotal: "Subtotal",
    total: "Total",
    coupon: "Discount code",
    checkout: "Checkout",
    remove: "Remove",
    quantity: "Quantity",
    free: "Free",
    free_shipping_reached: "You've unlocked free shipping!",
    free_shipping_missing: "Away from free shipping:",
};

impl DrawerLabels {
    /// Labels for `locale`; languages without a translation use English.
    #[must_use]
    pub const fn for_locale(locale: Locale) -> &'static Self {
        match locale {
            Locale::PtBr => &PORTUGUESE,
            _ => &ENGLISH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portuguese_labels() {
        let labels = DrawerLabels::for_locale(Locale::PtBr);
        assert_eq!(labels.free, "Grátis");
        assert_eq!(labels.continue_shopping, "Continuar comprando");
    }

    #[test]
    fn test_fallback_to_english() {
        for locale in [Locale::EnUs, Locale::EnGb, Locale::DeDe, Locale::FrFr] {
            assert_eq!(DrawerLabels::for_locale(locale).free, "Free");
        }
    }
}

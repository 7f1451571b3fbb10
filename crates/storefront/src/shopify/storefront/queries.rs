//! GraphQL documents and wire shapes for Storefront API cart operations.
//!
//! Every cart operation selects the same `CartFields` fragment so all of
//! them convert through one path in `conversions`.
//!
//! The schema is not vendored, so each operation implements
//! `graphql_client::GraphQLQuery` by hand instead of through the derive.

use graphql_client::{GraphQLQuery, QueryBody};
use serde::{Deserialize, Serialize};

macro_rules! cart_fields {
    () => {
        r"
fragment MoneyFields on MoneyV2 { amount currencyCode }

fragment CartFields on Cart {
  id
  checkoutUrl
  totalQuantity
  cost {
    subtotalAmount { ...MoneyFields }
    totalAmount { ...MoneyFields }
  }
  lines(first: 100) {
    pageInfo { hasNextPage }
    edges {
      node {
        id
        quantity
        cost {
          amountPerQuantity { ...MoneyFields }
          compareAtAmountPerQuantity { ...MoneyFields }
          subtotalAmount { ...MoneyFields }
          totalAmount { ...MoneyFields }
        }
        merchandise {
          ... on ProductVariant {
            id
            title
            image { url altText width height }
            product { handle title }
          }
        }
      }
    }
  }
}
"
    };
}

// =============================================================================
// Wire Shapes
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMoney {
    pub amount: String,
    pub currency_code: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawImage {
    pub url: String,
    pub alt_text: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawProduct {
    pub handle: String,
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawMerchandise {
    pub id: String,
    pub title: String,
    pub image: Option<RawImage>,
    pub product: RawProduct,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLineCost {
    pub amount_per_quantity: Option<RawMoney>,
    pub compare_at_amount_per_quantity: Option<RawMoney>,
    pub subtotal_amount: Option<RawMoney>,
    pub total_amount: Option<RawMoney>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLine {
    pub id: String,
    pub quantity: i64,
    #[serde(default)]
    pub cost: RawLineCost,
    pub merchandise: RawMerchandise,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLineEdge {
    pub node: RawLine,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPageInfo {
    pub has_next_page: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLines {
    #[serde(default)]
    pub page_info: RawPageInfo,
    pub edges: Vec<RawLineEdge>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCartCost {
    pub subtotal_amount: Option<RawMoney>,
    pub total_amount: Option<RawMoney>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCart {
    pub id: String,
    pub checkout_url: String,
    pub total_quantity: i64,
    #[serde(default)]
    pub cost: RawCartCost,
    #[serde(default)]
    pub lines: RawLines,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawUserError {
    pub code: Option<String>,
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Payload shared by every cart mutation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartPayload {
    pub cart: Option<RawCart>,
    #[serde(default)]
    pub user_errors: Vec<RawUserError>,
}

// =============================================================================
// Variables
// =============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineInputVars {
    pub merchandise_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LineUpdateVars {
    pub id: String,
    pub quantity: i64,
}

// =============================================================================
// Operations
// =============================================================================

pub struct GetCart;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetCartVariables {
    pub cart_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetCartData {
    pub cart: Option<RawCart>,
}

impl GetCart {
    pub const NAME: &'static str = "GetCart";
    pub const DOCUMENT: &'static str = concat!(
        "query GetCart($cartId: ID!) { cart(id: $cartId) { ...CartFields } }\n",
        cart_fields!()
    );
}

impl GraphQLQuery for GetCart {
    type Variables = GetCartVariables;
    type ResponseData = GetCartData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: Self::DOCUMENT,
            operation_name: Self::NAME,
        }
    }
}

pub struct CreateCart;

#[derive(Debug, Serialize)]
pub struct CreateCartInput {
    pub lines: Vec<LineInputVars>,
}

#[derive(Debug, Serialize)]
pub struct CreateCartVariables {
    pub input: CreateCartInput,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCartData {
    pub cart_create: Option<CartPayload>,
}

impl CreateCart {
    pub const NAME: &'static str = "CreateCart";
    pub const DOCUMENT: &'static str = concat!(
        "mutation CreateCart($input: CartInput!) {\n",
        "  cartCreate(input: $input) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    );
}

impl GraphQLQuery for CreateCart {
    type Variables = CreateCartVariables;
    type ResponseData = CreateCartData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: Self::DOCUMENT,
            operation_name: Self::NAME,
        }
    }
}

pub struct AddCartLines;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinesVariables {
    pub cart_id: String,
    pub lines: Vec<LineInputVars>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddCartLinesData {
    pub cart_lines_add: Option<CartPayload>,
}

impl AddCartLines {
    pub const NAME: &'static str = "AddCartLines";
    pub const DOCUMENT: &'static str = concat!(
        "mutation AddCartLines($cartId: ID!, $lines: [CartLineInput!]!) {\n",
        "  cartLinesAdd(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    );
}

impl GraphQLQuery for AddCartLines {
    type Variables = AddCartLinesVariables;
    type ResponseData = AddCartLinesData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: Self::DOCUMENT,
            operation_name: Self::NAME,
        }
    }
}

pub struct UpdateCartLines;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesVariables {
    pub cart_id: String,
    pub lines: Vec<LineUpdateVars>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCartLinesData {
    pub cart_lines_update: Option<CartPayload>,
}

impl UpdateCartLines {
    pub const NAME: &'static str = "UpdateCartLines";
    pub const DOCUMENT: &'static str = concat!(
        "mutation UpdateCartLines($cartId: ID!, $lines: [CartLineUpdateInput!]!) {\n",
        "  cartLinesUpdate(cartId: $cartId, lines: $lines) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    );
}

impl GraphQLQuery for UpdateCartLines {
    type Variables = UpdateCartLinesVariables;
    type ResponseData = UpdateCartLinesData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: Self::DOCUMENT,
            operation_name: Self::NAME,
        }
    }
}

pub struct RemoveCartLines;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLinesVariables {
    pub cart_id: String,
    pub line_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveCartLinesData {
    pub cart_lines_remove: Option<CartPayload>,
}

impl RemoveCartLines {
    pub const NAME: &'static str = "RemoveCartLines";
    pub const DOCUMENT: &'static str = concat!(
        "mutation RemoveCartLines($cartId: ID!, $lineIds: [ID!]!) {\n",
        "  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {\n",
        "    cart { ...CartFields }\n",
        "    userErrors { code field message }\n",
        "  }\n",
        "}\n",
        cart_fields!()
    );
}

impl GraphQLQuery for RemoveCartLines {
    type Variables = RemoveCartLinesVariables;
    type ResponseData = RemoveCartLinesData;

    fn build_query(variables: Self::Variables) -> QueryBody<Self::Variables> {
        QueryBody {
            variables,
            query: Self::DOCUMENT,
            operation_name: Self::NAME,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_documents_include_fragment() {
        for doc in [
            GetCart::DOCUMENT,
            CreateCart::DOCUMENT,
            AddCartLines::DOCUMENT,
            UpdateCartLines::DOCUMENT,
            RemoveCartLines::DOCUMENT,
        ] {
            assert!(doc.contains("fragment CartFields on Cart"));
            assert!(doc.contains("fragment MoneyFields on MoneyV2"));
            assert!(doc.contains("pageInfo { hasNextPage }"));
        }
    }

    #[test]
    fn test_build_query_names_operation() {
        let body = UpdateCartLines::build_query(UpdateCartLinesVariables {
            cart_id: "gid://shopify/Cart/1".to_string(),
            lines: vec![LineUpdateVars {
                id: "gid://shopify/CartLine/2".to_string(),
                quantity: 3,
            }],
        });

        assert_eq!(body.operation_name, "UpdateCartLines");
        assert!(body.query.starts_with("mutation UpdateCartLines("));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["operationName"], "UpdateCartLines");
        assert_eq!(json["variables"]["lines"][0]["quantity"], 3);
    }

    #[test]
    fn test_lines_page_info_defaults() {
        let lines: RawLines = serde_json::from_str(r#"{"edges": []}"#).unwrap();
        assert!(!lines.page_info.has_next_page);

        let lines: RawLines =
            serde_json::from_str(r#"{"pageInfo": {"hasNextPage": true}, "edges": []}"#).unwrap();
        assert!(lines.page_info.has_next_page);
    }

    #[test]
    fn test_variables_are_camel_case() {
        let vars = RemoveCartLinesVariables {
            cart_id: "gid://shopify/Cart/1".to_string(),
            line_ids: vec!["gid://shopify/CartLine/2".to_string()],
        };
        let json = serde_json::to_value(&vars).unwrap();
        assert_eq!(json["cartId"], "gid://shopify/Cart/1");
        assert_eq!(json["lineIds"][0], "gid://shopify/CartLine/2");
    }

    #[test]
    fn test_payload_tolerates_missing_user_errors() {
        let payload: CartPayload = serde_json::from_str(r#"{"cart": null}"#).unwrap();
        assert!(payload.cart.is_none());
        assert!(payload.user_errors.is_empty());
    }
}

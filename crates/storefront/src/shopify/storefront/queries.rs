//! GraphQL documents for the Shopify Storefront API.
//!
//! Documents are kept as plain strings and sent through the
//! `graphql_client::QueryBody` envelope; response shapes live in
//! `conversions`. Every cart operation selects the same `CartFields`
//! fragment so all of them return a complete snapshot.

/// Shared cart selection, appended to every cart document.
macro_rules! cart_fragment {
    () => {
        r"
fragment CartFields on Cart {
  id
  checkoutUrl
  note
  totalQuantity
  cost {
    subtotalAmount { amount currencyCode }
    totalAmount { amount currencyCode }
  }
  lines(first: 100) {
    edges {
      node {
        id
        quantity
        cost { totalAmount { amount currencyCode } }
        merchandise {
          ... on ProductVariant {
            id
            title
            price { amount currencyCode }
            product { id handle title }
          }
        }
      }
    }
  }
}
"
    };
}

/// A GraphQL document with its operation name.
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub document: &'static str,
}

pub const CREATE_CART: Operation = Operation {
    name: "CreateCart",
    document: concat!(
        r"mutation CreateCart($input: CartInput) {
  cartCreate(input: $input) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragment!()
    ),
};

pub const CREATE_CART_WITH_LINES: Operation = Operation {
    name: "CreateCartWithLines",
    document: concat!(
        r"mutation CreateCartWithLines($lines: [CartLineInput!]!) {
  cartCreate(input: { lines: $lines }) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragment!()
    ),
};

pub const FETCH_CART: Operation = Operation {
    name: "FetchCart",
    document: concat!(
        r"query FetchCart($id: ID!) {
  cart(id: $id) { ...CartFields }
}
",
        cart_fragment!()
    ),
};

pub const ADD_LINE_ITEM: Operation = Operation {
    name: "AddLineItem",
    document: concat!(
        r"mutation AddLineItem($cartId: ID!, $lines: [CartLineInput!]!) {
  cartLinesAdd(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragment!()
    ),
};

pub const UPDATE_LINE_ITEM: Operation = Operation {
    name: "UpdateLineItem",
    document: concat!(
        r"mutation UpdateLineItem($cartId: ID!, $lines: [CartLineUpdateInput!]!) {
  cartLinesUpdate(cartId: $cartId, lines: $lines) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragment!()
    ),
};

pub const REMOVE_LINE_ITEM: Operation = Operation {
    name: "RemoveLineItem",
    document: concat!(
        r"mutation RemoveLineItem($cartId: ID!, $lineIds: [ID!]!) {
  cartLinesRemove(cartId: $cartId, lineIds: $lineIds) {
    cart { ...CartFields }
    userErrors { code field message }
  }
}
",
        cart_fragment!()
    ),
};

pub const PRODUCT_BY_HANDLE: Operation = Operation {
    name: "ProductByHandle",
    document: r"query ProductByHandle($handle: String!, $variantCount: Int!) {
  product(handle: $handle) {
    id
    handle
    title
    availableForSale
    options { name values }
    variants(first: $variantCount) {
      edges {
        node {
          id
          title
          availableForSale
          quantityAvailable
          price { amount currencyCode }
          selectedOptions { name value }
        }
      }
    }
  }
}
",
};

pub const CUSTOMER_CREATE: Operation = Operation {
    name: "CustomerCreate",
    document: r"mutation CustomerCreate($input: CustomerCreateInput!) {
  customerCreate(input: $input) {
    customer { id email acceptsMarketing }
    customerUserErrors { code field message }
  }
}
",
};

use crate::models::{Product, ProductDetail, ProductId, ProductStatus};
use crate::services::settings::Theme;

const TITLE_LIMIT: usize = 50;
const RESET: &str = "\x1b[0m";

/// Shorten a product title for the list, keeping char boundaries intact.
pub fn truncate_title(title: Option<&str>) -> String {
    let Some(title) = title.map(str::trim).filter(|t| !t.is_empty()) else {
        return "Untitled Product".to_string();
    };
    if title.chars().count() <= TITLE_LIMIT {
        return title.to_string();
    }
    let cut: String = title.chars().take(TITLE_LIMIT).collect();
    format!("{}...", cut)
}

fn status_color(status: ProductStatus) -> &'static str {
    match status {
        ProductStatus::Completed => "\x1b[32m",
        ProductStatus::Failed => "\x1b[31m",
        _ => "\x1b[33m",
    }
}

pub fn render_products(
    products: &[Product],
    selected: Option<&ProductId>,
    theme: Theme,
    ansi: bool,
) -> String {
    if products.is_empty() {
        return "No products yet\nPaste an Amazon URL with `add <url>` to get started".to_string();
    }

    let mut out = format!("Your Products ({})\n", products.len());
    for (index, product) in products.iter().enumerate() {
        let marker = if selected == Some(&product.id) { '>' } else { ' ' };
        let label = product.status.label();
        let label = if ansi {
            format!("{}{}{}", status_color(product.status), label, RESET)
        } else {
            label.to_string()
        };

        out.push_str(&format!(
            "{} {:>2}. {}  [{}]\n",
            marker,
            index + 1,
            truncate_title(product.title.as_deref()),
            label
        ));

        if let Some(brand) = product.brand.as_deref().filter(|b| !b.is_empty()) {
            out.push_str(&format!("      {}\n", muted(brand, theme, ansi)));
        }
        if product.status == ProductStatus::Failed {
            if let Some(error) = &product.error_message {
                out.push_str(&format!("      {} (use `retry {}`)\n", error, index + 1));
            }
        }
    }
    out.trim_end().to_string()
}

pub fn render_detail(detail: &ProductDetail) -> String {
    let mut lines = vec![
        truncate_title(detail.title.as_deref()),
        format!("  URL:       {}", detail.url),
        format!("  Status:    {}", detail.status.label()),
    ];
    if let Some(brand) = &detail.brand {
        lines.push(format!("  Brand:     {}", brand));
    }
    match (&detail.current_price, &detail.original_price) {
        (Some(current), Some(original)) if current != original => {
            lines.push(format!("  Price:     {} (was {})", current, original))
        }
        (Some(current), _) => lines.push(format!("  Price:     {}", current)),
        _ => {}
    }
    if let Some(availability) = &detail.availability {
        lines.push(format!("  Stock:     {}", availability));
    }
    lines.push(format!("  Reviews:   {}", detail.review_count));
    lines.push(format!("  Vectors:   {}", detail.vector_count));
    if let Some(error) = &detail.error_message {
        lines.push(format!("  Error:     {}", error));
    }
    lines.join("\n")
}

fn muted(text: &str, theme: Theme, ansi: bool) -> String {
    if ansi {
        format!("{}{}{}", theme.muted(), text, RESET)
    } else {
        text.to_string()
    }
}

//! Product filter engine for the map view
//!
//! A product is kept when the keyword, category and distance predicates all
//! pass. The result is an order-preserving subsequence of the input and is
//! recomputed from scratch on every call.

use lomap_common::{Coordinate, Product};

use super::criteria::FilterCriteria;

/// Select the products matching `criteria`, in catalog order
///
/// `location` is the user's position, `None` when unknown (permission denied,
/// no fix yet, still loading). With a radius set and no location nothing can
/// satisfy the distance predicate, so the result is empty.
pub fn filter_products<'a>(
    products: &'a [Product],
    criteria: &FilterCriteria,
    location: Option<Coordinate>,
) -> Vec<&'a Product> {
    let keyword = criteria.keyword.to_lowercase();

    products
        .iter()
        .filter(|p| matches_keyword(p, &keyword))
        .filter(|p| matches_category(p, criteria))
        .filter(|p| within_radius(p, criteria.radius_km, location))
        .collect()
}

/// Case-insensitive substring match on name or description
///
/// `keyword` must already be lowercased.
fn matches_keyword(product: &Product, keyword: &str) -> bool {
    keyword.is_empty()
        || product.name.to_lowercase().contains(keyword)
        || product.description.to_lowercase().contains(keyword)
}

/// Exact, case-sensitive category match unless the "all" sentinel is set
fn matches_category(product: &Product, criteria: &FilterCriteria) -> bool {
    criteria.matches_any_category() || product.category == criteria.category
}

/// Inclusive great-circle radius check from the user's location
fn within_radius(product: &Product, radius_km: Option<f64>, location: Option<Coordinate>) -> bool {
    match (radius_km, location) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(radius), Some(user)) => user.distance_km(&product.location) <= radius,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str, name: &str, description: &str, category: &str, lat: f64, lon: f64) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            price_range: String::new(),
            seller_name: String::new(),
            seller_phone: String::new(),
            image_url: None,
            model_url: None,
            location: Coordinate::new(lat, lon),
            ratings: Vec::new(),
        }
    }

    /// Two-product catalog: a Hanoi textile and a Ha Giang honey
    fn catalog() -> Vec<Product> {
        vec![
            product("a", "Vải Thổ Cẩm", "Dệt thủ công từ sợi lanh", "Thủ công", 21.03, 105.85),
            product("b", "Mật Ong", "Mật ong hoa rừng nguyên chất", "Nông sản", 23.08, 105.30),
        ]
    }

    fn ids(products: &[&Product]) -> Vec<String> {
        products.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn test_match_all_returns_full_catalog_in_order() {
        let products = catalog();
        let result = filter_products(&products, &FilterCriteria::match_all(), None);
        assert_eq!(ids(&result), vec!["a", "b"]);
    }

    #[test]
    fn test_keyword_is_case_insensitive_substring() {
        let products = vec![product("h", "Mật Ong Hoa Rừng", "", "Nông sản", 23.08, 105.30)];

        for keyword in ["ong", "ONG", "mật ong hoa", "Rừng"] {
            let result = filter_products(&products, &FilterCriteria::keyword_only(keyword), None);
            assert_eq!(result.len(), 1, "keyword {:?} should match", keyword);
        }

        let result = filter_products(&products, &FilterCriteria::keyword_only("thổ cẩm"), None);
        assert!(result.is_empty());
    }

    #[test]
    fn test_keyword_matches_description() {
        let products = catalog();
        let result = filter_products(&products, &FilterCriteria::keyword_only("SỢI LANH"), None);
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_category_filter_is_exact() {
        let products = catalog();
        let criteria = FilterCriteria {
            category: "Nông sản".to_string(),
            ..FilterCriteria::match_all()
        };
        assert_eq!(ids(&filter_products(&products, &criteria, None)), vec!["b"]);

        let lowercase = FilterCriteria {
            category: "nông sản".to_string(),
            ..FilterCriteria::match_all()
        };
        assert!(filter_products(&products, &lowercase, None).is_empty());
    }

    #[test]
    fn test_all_category_never_excludes() {
        let products = catalog();
        for category in ["all", ""] {
            let criteria = FilterCriteria {
                category: category.to_string(),
                ..FilterCriteria::match_all()
            };
            assert_eq!(filter_products(&products, &criteria, None).len(), products.len());
        }
    }

    #[test]
    fn test_radius_with_unknown_location_is_empty() {
        let products = catalog();
        for radius in [0.0, 5.0, 20_000.0] {
            let criteria = FilterCriteria {
                radius_km: Some(radius),
                ..FilterCriteria::match_all()
            };
            assert!(filter_products(&products, &criteria, None).is_empty());

            let narrowed = FilterCriteria {
                keyword: "mật".to_string(),
                category: "Nông sản".to_string(),
                radius_km: Some(radius),
            };
            assert!(filter_products(&products, &narrowed, None).is_empty());
        }
    }

    #[test]
    fn test_radius_excludes_far_products() {
        let products = catalog();
        let criteria = FilterCriteria {
            radius_km: Some(5.0),
            ..FilterCriteria::match_all()
        };
        let result = filter_products(&products, &criteria, Some(Coordinate::new(21.03, 105.85)));
        assert_eq!(ids(&result), vec!["a"]);
    }

    #[test]
    fn test_radius_boundary_is_inclusive() {
        let products = catalog();
        let user = Coordinate::new(21.03, 105.85);
        let exact = lomap_common::haversine_km(user, products[1].location);

        let criteria = FilterCriteria {
            radius_km: Some(exact),
            ..FilterCriteria::match_all()
        };
        assert_eq!(ids(&filter_products(&products, &criteria, Some(user))), vec!["a", "b"]);

        let just_short = FilterCriteria {
            radius_km: Some(exact - 1e-6),
            ..FilterCriteria::match_all()
        };
        assert_eq!(ids(&filter_products(&products, &just_short, Some(user))), vec!["a"]);
    }

    #[test]
    fn test_predicates_are_combined_with_and() {
        let products = catalog();
        let user = Some(Coordinate::new(23.0, 105.3));
        let criteria = FilterCriteria {
            keyword: "mật".to_string(),
            category: "Thủ công".to_string(),
            radius_km: Some(50.0),
        };
        assert!(filter_products(&products, &criteria, user).is_empty());

        let criteria = FilterCriteria {
            category: "Nông sản".to_string(),
            ..criteria
        };
        assert_eq!(ids(&filter_products(&products, &criteria, user)), vec!["b"]);
    }
}

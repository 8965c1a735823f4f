//! Response classification.
//!
//! The four predicates are independent: a status may satisfy more than one
//! configured rule. Callers decide precedence by the order they ask in.

use crate::config::HttpStatusRules;
use crate::http::HttpResponse;

pub trait ResponseInterpreter {
    fn success(&self, response: &HttpResponse) -> bool;
    fn not_found(&self, response: &HttpResponse) -> bool;
    fn invalid(&self, response: &HttpResponse) -> bool;
    fn error(&self, response: &HttpResponse) -> bool;
}

/// Classifies by matching the status code against configured `StatusRule`s.
#[derive(Debug, Clone)]
pub struct HttpStatusCodeInterpreter {
    rules: HttpStatusRules,
}

impl HttpStatusCodeInterpreter {
    pub fn new(rules: HttpStatusRules) -> Self {
        Self { rules }
    }
}

impl ResponseInterpreter for HttpStatusCodeInterpreter {
    fn success(&self, response: &HttpResponse) -> bool {
        self.rules.success.matches(response.status)
    }

    fn not_found(&self, response: &HttpResponse) -> bool {
        self.rules.not_found.matches(response.status)
    }

    fn invalid(&self, response: &HttpResponse) -> bool {
        self.rules.invalid.matches(response.status)
    }

    fn error(&self, response: &HttpResponse) -> bool {
        self.rules.error.matches(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatusRule;
    use proptest::prelude::*;

    fn with_success(rule: StatusRule) -> HttpStatusCodeInterpreter {
        HttpStatusCodeInterpreter::new(HttpStatusRules {
            success: rule,
            ..HttpStatusRules::default()
        })
    }

    #[test]
    fn success_accepts_exact_list_and_wildcard_rules() {
        let ok = HttpResponse::new(200, "");
        assert!(with_success(StatusRule::Code(200)).success(&ok));
        assert!(with_success(StatusRule::List(vec![200, 201])).success(&ok));
        assert!(with_success(StatusRule::Pattern("2*".to_string())).success(&ok));
    }

    #[test]
    fn wildcard_success_rejects_404() {
        let missing = HttpResponse::new(404, "");
        assert!(!with_success(StatusRule::Pattern("2*".to_string())).success(&missing));
    }

    #[test]
    fn default_rules() {
        let interpreter = HttpStatusCodeInterpreter::new(HttpStatusRules::default());
        assert!(interpreter.success(&HttpResponse::new(201, "")));
        assert!(interpreter.not_found(&HttpResponse::new(404, "")));
        assert!(interpreter.invalid(&HttpResponse::new(422, "")));
        assert!(interpreter.error(&HttpResponse::new(500, "")));

        let teapot = HttpResponse::new(418, "");
        assert!(!interpreter.success(&teapot));
        assert!(!interpreter.not_found(&teapot));
        assert!(!interpreter.invalid(&teapot));
        assert!(!interpreter.error(&teapot));
    }

    #[test]
    fn categories_may_overlap() {
        let interpreter = HttpStatusCodeInterpreter::new(HttpStatusRules {
            invalid: StatusRule::Pattern("4*".to_string()),
            ..HttpStatusRules::default()
        });
        let resp = HttpResponse::new(404, "");
        assert!(interpreter.not_found(&resp));
        assert!(interpreter.invalid(&resp));
    }

    proptest! {
        #[test]
        fn leading_digit_glob_matches_exactly_its_class(status in 100u16..600) {
            let interpreter = with_success(StatusRule::Pattern("2*".to_string()));
            let resp = HttpResponse::new(status, "");
            prop_assert_eq!(interpreter.success(&resp), (200..300).contains(&status));
        }
    }
}

//! Request/response handlers, one per named function.

use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::categorize::Categorizer;
use crate::db::Store;
use crate::error::{AppError, ValidationError};
use crate::models::{BudgetDraft, DealFilter, MarketDraft, ProductDraft, PurchaseRecordDraft};
use crate::receipt::{self, ReceiptRequest};
use crate::service;

pub(crate) const FUNCTIONS: &[&str] = &[
    "create-purchase-record",
    "get-purchase-records",
    "get-budget-status",
    "set-budget",
    "get-purchase-categories",
    "get-spending-summary",
    "process-receipt-ocr",
    "create-markets",
    "get-markets",
    "create-products",
    "get-products",
    "get-deals",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Other(String),
}

impl From<&str> for Method {
    fn from(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "GET" => Self::Get,
            "POST" => Self::Post,
            other => Self::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Other(m) => write!(f, "{m}"),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Request {
    pub(crate) method: Method,
    pub(crate) query: HashMap<String, String>,
    pub(crate) body: Option<String>,
}

impl Request {
    pub(crate) fn get() -> Self {
        Self {
            method: Method::Get,
            query: HashMap::new(),
            body: None,
        }
    }

    pub(crate) fn post(body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            query: HashMap::new(),
            body: Some(body.into()),
        }
    }

    pub(crate) fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    fn user_id(&self) -> &str {
        self.param("user_id").unwrap_or_default()
    }

    fn json<T: DeserializeOwned>(&self) -> Result<T, HandlerError> {
        let body = self.body.as_deref().unwrap_or_default();
        serde_json::from_str(body).map_err(|e| HandlerError::MalformedPayload(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Response {
    pub(crate) status: u16,
    pub(crate) body: String,
}

impl Response {
    fn ok(value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(body) => Self { status: 200, body },
            Err(e) => HandlerError::Internal(e.to_string()).into_response(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self {
            status,
            body: serde_json::json!({ "error": message }).to_string(),
        }
    }
}

#[derive(Debug, Error)]
enum HandlerError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Function not found: {0}")]
    NotFound(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Invalid query parameter: {0}")]
    BadParam(&'static str),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("{0}")]
    Internal(String),
}

impl From<ValidationError> for HandlerError {
    fn from(err: ValidationError) -> Self {
        Self::App(err.into())
    }
}

impl HandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MethodNotAllowed => 405,
            Self::NotFound(_) => 404,
            Self::MalformedPayload(_) | Self::BadParam(_) => 400,
            Self::App(AppError::Validation(_)) => 400,
            Self::App(AppError::Storage(_)) | Self::Internal(_) => 500,
        };
        if status == 405 {
            return Response {
                status,
                body: self.to_string(),
            };
        }
        if status >= 500 {
            log::error!("{self}");
        }
        Response::error(status, &self.to_string())
    }
}

/// Run the function `name` against `store`.
pub(crate) fn dispatch(store: &mut impl Store, name: &str, req: &Request) -> Response {
    log::debug!("{} {name}", req.method);
    match handle(store, name, req) {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

fn handle(store: &mut impl Store, name: &str, req: &Request) -> Result<Response, HandlerError> {
    let expected = match name {
        "create-purchase-record" | "set-budget" | "process-receipt-ocr" | "create-markets"
        | "create-products" => Method::Post,
        n if FUNCTIONS.contains(&n) => Method::Get,
        _ => return Err(HandlerError::NotFound(name.to_string())),
    };
    if req.method != expected {
        return Err(HandlerError::MethodNotAllowed);
    }

    let response = match name {
        "create-purchase-record" => {
            let draft: PurchaseRecordDraft = req.json()?;
            Response::ok(&service::insert_purchase_record(store, draft)?)
        }
        "get-purchase-records" => {
            let limit = match req.param("limit") {
                Some(v) => v.trim().parse::<u32>().map_err(|_| ValidationError::InvalidPageLimit)?,
                None => service::DEFAULT_PAGE_LIMIT,
            };
            let offset = match req.param("offset") {
                Some(v) => v.trim().parse::<i64>().map_err(|_| ValidationError::InvalidPageOffset)?,
                None => 0,
            };
            Response::ok(&service::purchase_records(&*store, req.user_id(), limit, offset)?)
        }
        "get-budget-status" => {
            Response::ok(&service::budget_status(&*store, req.user_id(), req.param("month"))?)
        }
        "set-budget" => {
            let draft: BudgetDraft = req.json()?;
            Response::ok(&service::set_budget(store, draft)?)
        }
        "get-purchase-categories" => {
            Response::ok(&service::purchase_categories(store, req.user_id())?)
        }
        "get-spending-summary" => {
            Response::ok(&service::spending_summary(&*store, req.user_id(), req.param("month"))?)
        }
        "process-receipt-ocr" => {
            let request: ReceiptRequest = req.json()?;
            let outcome = receipt::process_receipt(store, &Categorizer::default(), request)?;
            Response::ok(&outcome)
        }
        "create-markets" => {
            let draft: MarketDraft = req.json()?;
            Response::ok(&service::create_market(store, draft)?)
        }
        "get-markets" => Response::ok(&service::list_markets(&*store, req.user_id())?),
        "create-products" => {
            let draft: ProductDraft = req.json()?;
            Response::ok(&service::create_product(store, draft)?)
        }
        "get-products" => Response::ok(&service::list_products(&*store, req.user_id())?),
        "get-deals" => {
            let filter = deal_filter(req)?;
            Response::ok(&service::best_deals(&*store, req.user_id(), &filter)?)
        }
        _ => return Err(HandlerError::NotFound(name.to_string())),
    };
    Ok(response)
}

fn deal_filter(req: &Request) -> Result<DealFilter, HandlerError> {
    let market_id = req
        .param("market_id")
        .map(|v| v.trim().parse::<i64>())
        .transpose()
        .map_err(|_| HandlerError::BadParam("market_id"))?;
    let max_price = req
        .param("max_price")
        .map(|v| Decimal::from_str(v.trim()))
        .transpose()
        .map_err(|_| HandlerError::BadParam("max_price"))?;

    Ok(DealFilter {
        category: req.param("category").map(str::to_string),
        market_id,
        max_price,
    })
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use shopkeep_core::{
    CategoryRef, Entity, Error, GraphBackend, Product, ProductId, RelationKind,
    RelationshipQuery, Result, ResultOrdering, StockStatus, size_number,
};
use std::env;

/// Env var key for the Neo4j HTTP endpoint.
const ENV_NEO4J_URI: &str = "NEO4J_URI";
/// Env var key for the Neo4j database name.
const ENV_NEO4J_DATABASE: &str = "NEO4J_DATABASE";
/// Env var key for the Neo4j user.
const ENV_NEO4J_USER: &str = "NEO4J_USER";
/// Env var key for the Neo4j password.
const ENV_NEO4J_PASSWORD: &str = "NEO4J_PASSWORD";

/// Connection settings for the Neo4j HTTP API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Neo4jConfig {
    /// Base HTTP URI, e.g. `http://localhost:7474`
    pub uri: Option<String>,
    /// Database name
    pub database: Option<String>,
    /// User for basic auth
    pub user: Option<String>,
    /// Password for basic auth
    pub password: Option<String>,
}

impl Neo4jConfig {
    /// Endpoint URI, checking config first, then `NEO4J_URI`.
    pub fn uri(&self) -> String {
        resolve(self.uri.as_ref(), ENV_NEO4J_URI, "http://localhost:7474")
    }

    /// Database name, checking config first, then `NEO4J_DATABASE`.
    pub fn database(&self) -> String {
        resolve(self.database.as_ref(), ENV_NEO4J_DATABASE, "neo4j")
    }

    /// User, checking config first, then `NEO4J_USER`.
    pub fn user(&self) -> String {
        resolve(self.user.as_ref(), ENV_NEO4J_USER, "neo4j")
    }

    /// Password, checking config first, then `NEO4J_PASSWORD`.
    pub fn password(&self) -> String {
        resolve(self.password.as_ref(), ENV_NEO4J_PASSWORD, "password")
    }
}

fn resolve(configured: Option<&String>, env_key: &str, fallback: &str) -> String {
    configured
        .cloned()
        .or_else(|| env::var(env_key).ok())
        .unwrap_or_else(|| fallback.to_owned())
}

/// Graph backend talking to Neo4j through its HTTP transactional endpoint.
///
/// Expects the schema written by the catalog ingestion: `Producto` nodes with
/// `id`, `name`, `price`, `stock_status`; `Categoria` nodes with `name`; and
/// the `PERTENECE_A`, `SIMILAR_A` and `MAS_BARATO_QUE` relationships.
pub struct Neo4jHttpBackend {
    /// HTTP client, pooled and shared by all requests.
    client: Client,
    /// `{uri}/db/{database}/tx/commit`
    endpoint: String,
    /// Basic auth user.
    user: String,
    /// Basic auth password.
    password: String,
}

impl Neo4jHttpBackend {
    /// Creates a backend from resolved connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is not an `http(s)` URI.
    pub fn new(config: &Neo4jConfig) -> Result<Self> {
        let uri = config.uri();
        if !(uri.starts_with("http://") || uri.starts_with("https://")) {
            return Err(Error::Config(format!(
                "Neo4j URI must use the HTTP API (http:// or https://), got {uri}"
            )));
        }

        Ok(Self {
            client: Client::default(),
            endpoint: format!(
                "{}/db/{}/tx/commit",
                uri.trim_end_matches('/'),
                config.database()
            ),
            user: config.user(),
            password: config.password(),
        })
    }

    /// Endpoint requests are posted to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn run(&self, statement: CypherStatement) -> Result<Vec<Product>> {
        tracing::debug!("Cypher: {}", statement.statement.trim());

        let request = TxRequest {
            statements: vec![statement],
        };
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| Error::Unavailable(format!("Neo4j request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            return Err(Error::Unavailable(format!(
                "Neo4j HTTP error {status}: {error_text}"
            )));
        }

        let body: TxResponse = response
            .json()
            .await
            .map_err(|err| Error::InvalidResponse(format!("Neo4j response: {err}")))?;
        parse_response(body)
    }
}

/// Request payload for the transactional endpoint.
#[derive(Debug, Serialize)]
struct TxRequest {
    /// Statements executed in one implicit transaction.
    statements: Vec<CypherStatement>,
}

/// A single Cypher statement with its parameters.
#[derive(Debug, Serialize)]
struct CypherStatement {
    /// Cypher text.
    statement: String,
    /// Named parameters referenced as `$name`.
    parameters: Map<String, Value>,
}

/// Response payload from the transactional endpoint.
#[derive(Debug, Deserialize)]
struct TxResponse {
    /// One result per statement.
    #[serde(default)]
    results: Vec<TxResult>,
    /// Cypher-level errors.
    #[serde(default)]
    errors: Vec<TxError>,
}

/// Rows returned by one statement.
#[derive(Debug, Deserialize)]
struct TxResult {
    /// Column names in row order.
    columns: Vec<String>,
    /// Row payloads.
    data: Vec<TxRow>,
}

/// One row of values.
#[derive(Debug, Deserialize)]
struct TxRow {
    /// Values positioned like `TxResult::columns`.
    row: Vec<Value>,
}

/// A Cypher error.
#[derive(Debug, Deserialize)]
struct TxError {
    /// Neo4j status code.
    code: String,
    /// Human-readable message.
    message: String,
}

const RETURN_COLUMNS: &str = "toString(p.id) AS id, p.name AS name, p.price AS price, \
                              p.stock_status AS stock_status, categories, p.sizes AS sizes";

/// Builds the Cypher statement for a relationship query.
fn build_statement(query: &RelationshipQuery) -> CypherStatement {
    let mut parameters = Map::new();
    parameters.insert("limit".to_owned(), json!(query.limit));

    let anchor_predicate = match &query.entity {
        Entity::Name(name) => {
            parameters.insert("name".to_owned(), json!(name));
            "toLower(ref.name) CONTAINS toLower($name)"
        }
        Entity::Ids(ids) => {
            parameters.insert(
                "ids".to_owned(),
                json!(ids.iter().map(ProductId::as_str).collect::<Vec<_>>()),
            );
            "toString(ref.id) IN $ids"
        }
    };
    // A name may match several products; the first one is the reference.
    let anchor_limit = if matches!(query.entity, Entity::Name(_)) {
        " WITH ref LIMIT 1"
    } else {
        ""
    };

    let mut statement = match query.relation {
        RelationKind::Lookup => format!(
            "MATCH (p:Producto) WHERE {}",
            anchor_predicate.replace("ref.", "p.")
        ),
        RelationKind::SimilarTo => format!(
            "MATCH (ref:Producto) WHERE {anchor_predicate}{anchor_limit} \
             MATCH (ref)-[:SIMILAR_A]-(p:Producto) WHERE p.id <> ref.id"
        ),
        RelationKind::CheaperThan => format!(
            "MATCH (ref:Producto) WHERE {anchor_predicate}{anchor_limit} \
             MATCH (p:Producto)-[:MAS_BARATO_QUE]->(ref) WHERE p.id <> ref.id"
        ),
        RelationKind::BelongsToCategory => match &query.entity {
            Entity::Name(_) => "MATCH (p:Producto)-[:PERTENECE_A]->(c:Categoria) \
                                WHERE toLower(c.name) CONTAINS toLower($name)"
                .to_owned(),
            Entity::Ids(_) => "MATCH (ref:Producto)-[:PERTENECE_A]->(:Categoria)<-[:PERTENECE_A]-(p:Producto) \
                               WHERE toString(ref.id) IN $ids"
                .to_owned(),
        },
    };

    let filters = &query.filters;
    if filters.in_stock_only {
        statement.push_str(" AND p.stock_status = 'instock'");
    }
    if let Some(max_price) = filters.max_price {
        parameters.insert("max_price".to_owned(), json!(max_price));
        statement.push_str(" AND p.price <= $max_price");
    }
    if let Some(min_price) = filters.min_price {
        parameters.insert("min_price".to_owned(), json!(min_price));
        statement.push_str(" AND p.price >= $min_price");
    }
    if let Some(category) = &filters.category {
        parameters.insert("category".to_owned(), json!(category));
        statement.push_str(
            " AND EXISTS { MATCH (p)-[:PERTENECE_A]->(fc:Categoria) \
             WHERE toLower(fc.name) CONTAINS toLower($category) }",
        );
    }
    if let Some(size) = &filters.size {
        statement.push_str(&size_predicate(size, &mut parameters));
    }
    if let Some(ids) = &filters.candidate_ids {
        parameters.insert(
            "candidate_ids".to_owned(),
            json!(ids.iter().map(ProductId::as_str).collect::<Vec<_>>()),
        );
        statement.push_str(" AND toString(p.id) IN $candidate_ids");
    }

    let has_reference = !matches!(
        (query.relation, &query.entity),
        (RelationKind::Lookup, _) | (RelationKind::BelongsToCategory, Entity::Name(_))
    );
    let carried = if has_reference { "ref, p" } else { "p" };
    statement.push_str(&format!(
        " WITH DISTINCT {carried} OPTIONAL MATCH (p)-[:PERTENECE_A]->(pc:Categoria) \
         WITH {carried}, collect(pc.name) AS categories"
    ));

    let order_by = match query.ordering {
        ResultOrdering::SameCategoryThenNearestPrice if has_reference => {
            statement.push_str(
                " OPTIONAL MATCH (ref)-[:PERTENECE_A]->(rc:Categoria) \
                 WITH ref, p, categories, collect(rc.name) AS ref_categories",
            );
            " ORDER BY any(name IN categories WHERE name IN ref_categories) DESC, \
             abs(p.price - ref.price) ASC"
        }
        ResultOrdering::PriceAscending => " ORDER BY p.price ASC",
        _ => "",
    };

    statement.push_str(" RETURN ");
    statement.push_str(RETURN_COLUMNS);
    statement.push_str(order_by);
    statement.push_str(" LIMIT $limit");

    CypherStatement {
        statement,
        parameters,
    }
}

/// Sizes are stored either as a list or as one comma-joined string.
const OFFERED_SIZES: &str = "CASE WHEN p.sizes IS NULL THEN [] \
                             WHEN valueType(p.sizes) STARTS WITH 'LIST' \
                             THEN [offered IN p.sizes | trim(toString(offered))] \
                             ELSE [offered IN split(toString(p.sizes), ',') | trim(offered)] END";

/// Size predicate matching [`RecordFilters::matches`]: a product without
/// sizes passes, numeric sizes compare on their leading number and letter
/// sizes compare case-insensitively.
fn size_predicate(size: &str, parameters: &mut Map<String, Value>) -> String {
    let offered_match = if let Some(number) = size_number(size) {
        parameters.insert("size_number".to_owned(), json!(number));
        "offered STARTS WITH $size_number AND (size(offered) = size($size_number) \
         OR NOT substring(offered, size($size_number), 1) \
         IN ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ','])"
    } else {
        parameters.insert("size".to_owned(), json!(size.trim()));
        "toLower(offered) = toLower($size)"
    };
    format!(
        " AND (size([offered IN {OFFERED_SIZES} WHERE offered <> '']) = 0 \
         OR any(offered IN {OFFERED_SIZES} WHERE {offered_match}))"
    )
}

/// Converts a transactional response into product records.
fn parse_response(body: TxResponse) -> Result<Vec<Product>> {
    if let Some(error) = body.errors.first() {
        return Err(Error::InvalidResponse(format!(
            "{}: {}",
            error.code, error.message
        )));
    }

    let Some(result) = body.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    let column = |name: &str| result.columns.iter().position(|column| column == name);
    let (Some(id_col), Some(name_col), Some(price_col)) =
        (column("id"), column("name"), column("price"))
    else {
        return Err(Error::InvalidResponse(
            "result is missing id, name or price columns".to_owned(),
        ));
    };
    let stock_col = column("stock_status");
    let categories_col = column("categories");
    let sizes_col = column("sizes");

    result
        .data
        .iter()
        .map(|data| {
            let row = &data.row;
            let id = match row.get(id_col) {
                Some(Value::String(text)) => text.clone(),
                Some(Value::Number(number)) => number.to_string(),
                _ => return Err(Error::InvalidResponse("record without id".to_owned())),
            };
            let name = row
                .get(name_col)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::InvalidResponse(format!("record {id} without name")))?;
            let price = row
                .get(price_col)
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::InvalidResponse(format!("record {id} without price")))?;
            let stock_status = stock_col
                .and_then(|index| row.get(index))
                .cloned()
                .and_then(|value| serde_json::from_value::<StockStatus>(value).ok())
                .unwrap_or(StockStatus::Unknown);

            let mut product = Product::new(id, name, price).with_stock_status(stock_status);
            product.categories = string_list(categories_col.and_then(|index| row.get(index)))
                .into_iter()
                .map(CategoryRef::new)
                .collect();
            product.sizes = string_list(sizes_col.and_then(|index| row.get(index)));
            Ok(product)
        })
        .collect()
}

/// Reads a list of strings, also accepting the comma-joined form.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text.clone()),
                Value::Number(number) => Some(number.to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl GraphBackend for Neo4jHttpBackend {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    async fn execute_relationship_query(&self, query: &RelationshipQuery) -> Result<Vec<Product>> {
        let records = self.run(build_statement(query)).await?;
        Ok(records
            .into_iter()
            .filter(|product| query.filters.matches(product))
            .collect())
    }
}

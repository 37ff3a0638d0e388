use warp::{
    http::{header, Response, StatusCode},
    hyper::Body,
    reject::Rejection,
};

use crate::{actions::ShoppingList, constants::SHOPPING_LIST_FILENAME, error::ServiceError};

/// Serves the aggregated list as a plain text attachment.
pub fn shopping_list_reply(list: &ShoppingList) -> Result<Response<Body>, ServiceError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
        )
        .body(Body::from(list.to_bytes()))
        .map_err(|e| ServiceError::Internal(format!("Failed to build response: {e}")))
}

pub fn error_reply(error: &ServiceError) -> Response<Body> {
    let status =
        StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::json!({ "detail": error.to_string() }).to_string();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );
    response
}

/// Turns rejections raised by the session filters into error responses.
pub async fn recover(rejection: Rejection) -> Result<Response<Body>, Rejection> {
    match rejection.find::<ServiceError>() {
        Some(error) => Ok(error_reply(error)),
        None => Err(rejection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CartIngredientRow;

    fn row(name: &str, amount: i32) -> CartIngredientRow {
        CartIngredientRow {
            name: name.to_string(),
            measurement_unit: String::from("g"),
            amount,
        }
    }

    #[tokio::test]
    async fn shopping_list_is_an_attachment() {
        let list = ShoppingList::aggregate(vec![row("flour", 100), row("flour", 50)]);
        let response = shopping_list_reply(&list).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"shopping_car.txt\""
        );

        let body = warp::hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"flour (g) - 150\n");
    }

    #[test]
    fn errors_carry_their_status() {
        let response = error_reply(&ServiceError::AlreadyExists(String::from("dup")));
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let response = error_reply(&ServiceError::validation("name", "blank"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unrelated_rejections_pass_through() {
        assert!(recover(warp::reject::not_found()).await.is_err());
        let response = recover(warp::reject::custom(ServiceError::PermissionDenied(
            String::from("not yours"),
        )))
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}

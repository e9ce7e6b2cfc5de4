//! Shared application state.

use domain::{
    CartService, CatalogService, CategoryService, CoverService, FavouriteService, OrderService,
    TokenIssuer, UserService,
};
use storage::Store;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub users: UserService<S>,
    pub categories: CategoryService<S>,
    pub covers: CoverService<S>,
    pub catalog: CatalogService<S>,
    pub favourites: FavouriteService<S>,
    pub cart: CartService<S>,
    pub orders: OrderService<S>,
}

impl<S: Store + Clone> AppState<S> {
    /// Builds every service over the same store handle.
    pub fn new(store: S, tokens: TokenIssuer) -> Self {
        Self {
            users: UserService::new(store.clone(), tokens),
            categories: CategoryService::new(store.clone()),
            covers: CoverService::new(store.clone()),
            catalog: CatalogService::new(store.clone()),
            favourites: FavouriteService::new(store.clone()),
            cart: CartService::new(store.clone()),
            orders: OrderService::new(store),
        }
    }
}

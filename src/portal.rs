use std::sync::Arc;

use crate::access::{self, AccessLevel, Capabilities, Operation};
use crate::api::ApiClient;
use crate::approval::{self, AssignmentStatus, Transition};
use crate::cache::{QueryCache, QueryKey, QueryScope};
use crate::config::Config;
use crate::disclosure::{
    Disclosure, Provenance, Secret, SecretDisclosure, CLIENT_ID, CLIENT_SECRET, PRIVATE_KEY,
    PUBLIC_KEY,
};
use crate::error::PortalError;
use crate::models::{
    AppKeyPair, Application, ApplicationUpdate, Country, CountryStatus, CountryUpdate,
    NewApplication, NewCountry, NewPairing, PairingUpdate, Product, ProductInput, ProductPairing,
    ProductStatus, UserAccount, UserAccountUpdate, ADMIN_OWNER_SENTINEL,
};
use crate::mutation::{ActionKey, MutationOrchestrator};
use crate::resources::auth::SignupRequest;
use crate::resources::{
    countries, pairings, products, Applications, Auth, Countries, Pairings, Products,
    UserAccounts,
};
use crate::session::{FileSessionStore, Session, SessionStore, SessionUser};

/// Entry point for views: role gating, cached reads and orchestrated writes
/// over the resource clients.
#[derive(Clone)]
pub struct Portal {
    config: Config,
    api: ApiClient,
    cache: QueryCache,
    mutations: MutationOrchestrator,
}

impl Portal {
    /// Builds a portal whose session persists to `config.session_file`.
    pub async fn connect(config: Config) -> Result<Self, PortalError> {
        let store = Arc::new(FileSessionStore::new(config.session_file.clone()));
        Self::with_store(config, store).await
    }

    pub async fn with_store(
        config: Config,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self, PortalError> {
        let session = Session::load(store).await;
        let api = ApiClient::new(&config, session)?;
        let cache = QueryCache::new();
        let mutations = MutationOrchestrator::new(cache.clone());

        Ok(Self {
            config,
            api,
            cache,
            mutations,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn mutations(&self) -> &MutationOrchestrator {
        &self.mutations
    }

    pub fn applications(&self) -> Applications<'_> {
        Applications::new(&self.api)
    }

    pub fn countries(&self) -> Countries<'_> {
        Countries::new(&self.api)
    }

    pub fn products(&self) -> Products<'_> {
        Products::new(&self.api)
    }

    pub fn pairings(&self) -> Pairings<'_> {
        Pairings::new(&self.api)
    }

    pub fn user_accounts(&self) -> UserAccounts<'_> {
        UserAccounts::new(&self.api)
    }

    pub fn auth(&self) -> Auth<'_> {
        Auth::new(&self.api)
    }

    // --- Session and capabilities ---

    /// Access level of the signed-in user; standard when unknown.
    pub fn access_level(&self) -> AccessLevel {
        self.session().access_level().unwrap_or(AccessLevel::Standard)
    }

    pub fn current_user(&self) -> Result<SessionUser, PortalError> {
        self.session().user().ok_or(PortalError::NotSignedIn)
    }

    pub fn capabilities(&self, selected_application: Option<&str>) -> Capabilities {
        access::resolve(self.access_level(), selected_application.is_some())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Option<SessionUser>, PortalError> {
        let user = self.auth().login(email, password).await?;
        self.cache.clear().await;
        Ok(user)
    }

    pub async fn signup(&self, request: &SignupRequest) -> Result<Option<SessionUser>, PortalError> {
        let user = self.auth().signup(request).await?;
        self.cache.clear().await;
        Ok(user)
    }

    pub async fn google_login(&self, credential: &str) -> Result<Option<SessionUser>, PortalError> {
        let user = self.auth().google(credential).await?;
        self.cache.clear().await;
        Ok(user)
    }

    pub async fn google_signup(&self, credential: &str) -> Result<Option<SessionUser>, PortalError> {
        let user = self.auth().google_signup(credential).await?;
        self.cache.clear().await;
        Ok(user)
    }

    pub async fn logout(&self) -> Result<(), PortalError> {
        self.cache.clear().await;
        self.session().clear().await?;
        tracing::info!("signed out");
        Ok(())
    }

    // --- Applications ---

    /// Admins see every application; standard users only their own.
    pub async fn list_applications(&self) -> Result<Vec<Application>, PortalError> {
        let level = self.access_level();
        let user_id = match level {
            AccessLevel::Admin => {
                self.capabilities(None).require(Operation::ListAllApplications)?;
                None
            }
            AccessLevel::Standard => {
                self.capabilities(None).require(Operation::ListOwnApplications)?;
                Some(self.current_user()?.id)
            }
        };

        let key = QueryKey::Applications {
            user_id: user_id.clone(),
        };
        let owner = user_id.unwrap_or_default();
        let applications = self.applications();
        self.cache
            .get_or_fetch(key, || applications.list(level, &owner))
            .await
    }

    pub async fn application(&self, client_id: &str) -> Result<Application, PortalError> {
        let key = QueryKey::Application {
            client_id: client_id.to_string(),
        };
        let applications = self.applications();
        self.cache
            .get_or_fetch(key, || applications.get(client_id))
            .await
    }

    pub async fn app_keys(&self, client_id: &str) -> Result<Option<AppKeyPair>, PortalError> {
        let key = QueryKey::AppKeys {
            client_id: client_id.to_string(),
        };
        let applications = self.applications();
        self.cache
            .get_or_fetch(key, || applications.get_app_keys(client_id))
            .await
    }

    /// Creates an application and discloses its client id and secret once.
    pub async fn create_application(
        &self,
        input: &NewApplication,
        dialog: &mut SecretDisclosure,
    ) -> Result<Application, PortalError> {
        self.capabilities(None).require(Operation::CreateApplication)?;
        let owner_id = match self.access_level() {
            AccessLevel::Admin => ADMIN_OWNER_SENTINEL.to_string(),
            AccessLevel::Standard => self.current_user()?.id,
        };

        dialog.begin()?;
        let result = self
            .mutations
            .run(
                ActionKey::new("create-application"),
                &[QueryScope::Applications],
                self.applications().create(input, &owner_id),
            )
            .await;

        match result {
            Ok(created) => {
                let application = created.application;
                dialog.disclose(
                    Disclosure::issued(application.client_id.clone())
                        .with_field(CLIENT_ID, Secret::new(application.client_id.clone()))
                        .with_field(CLIENT_SECRET, created.client_secret),
                );
                Ok(application)
            }
            Err(e) => {
                dialog.fail();
                Err(e)
            }
        }
    }

    pub async fn update_application(
        &self,
        application: &Application,
        changes: &ApplicationUpdate,
    ) -> Result<Application, PortalError> {
        self.capabilities(None).require(Operation::UpdateApplication)?;
        self.mutations
            .run(
                ActionKey::on("update-application", &application.id),
                &[QueryScope::Application(application.client_id.clone())],
                self.applications().update(&application.id, changes),
            )
            .await
    }

    /// Terminal: the application and its credentials are gone.
    pub async fn delete_application(&self, application: &Application) -> Result<(), PortalError> {
        self.capabilities(None).require(Operation::DeleteApplication)?;
        self.mutations
            .run(
                ActionKey::on("delete-application", &application.id),
                &[
                    QueryScope::Applications,
                    QueryScope::Pairings(application.client_id.clone()),
                ],
                self.applications().delete(&application.id),
            )
            .await
    }

    /// Rotates the client secret and discloses the new one once.
    ///
    /// When rotation fails and the placeholder fallback is enabled, the dialog
    /// still opens with a locally generated value marked
    /// [`Provenance::Placeholder`]; that value is not a working credential.
    pub async fn regenerate_secret(
        &self,
        client_id: &str,
        reason: &str,
        dialog: &mut SecretDisclosure,
    ) -> Result<Provenance, PortalError> {
        self.capabilities(None)
            .require(Operation::RotateApplicationCredentials)?;

        dialog.begin()?;
        let result = self
            .mutations
            .run(
                ActionKey::on("rotate-secret", client_id),
                &[QueryScope::Application(client_id.to_string())],
                self.applications().rotate_secret(client_id, reason),
            )
            .await;

        match result {
            Ok(rotated) => {
                dialog.disclose(
                    Disclosure::issued(rotated.client_id)
                        .with_field(CLIENT_SECRET, rotated.client_secret),
                );
                Ok(Provenance::Issued)
            }
            Err(e) if self.config.placeholder_secret_on_failure && !e.is_local() => {
                tracing::warn!(
                    client_id,
                    "secret rotation failed, showing a placeholder that is not a real credential: {e}"
                );
                dialog.disclose(Disclosure::placeholder(client_id));
                Ok(Provenance::Placeholder)
            }
            Err(e) => {
                dialog.fail();
                Err(e)
            }
        }
    }

    /// Rotates the key pair and discloses the new key material once.
    pub async fn rotate_keys(
        &self,
        client_id: &str,
        reason: &str,
        dialog: &mut SecretDisclosure,
    ) -> Result<AppKeyPair, PortalError> {
        self.capabilities(None)
            .require(Operation::RotateApplicationCredentials)?;

        dialog.begin()?;
        let result = self
            .mutations
            .run(
                ActionKey::on("rotate-keys", client_id),
                &[QueryScope::Application(client_id.to_string())],
                self.applications().rotate_keys(client_id, reason),
            )
            .await;

        match result {
            Ok(rotated) => {
                let mut disclosure = Disclosure::issued(client_id).with_field(
                    PUBLIC_KEY,
                    Secret::new(rotated.key_pair.public_key.clone()),
                );
                if let Some(private_key) = rotated.private_key {
                    disclosure = disclosure.with_field(PRIVATE_KEY, private_key);
                }
                dialog.disclose(disclosure);
                Ok(rotated.key_pair)
            }
            Err(e) => {
                dialog.fail();
                Err(e)
            }
        }
    }

    // --- Countries ---

    /// Active countries for standard users, all of them for admins. Never
    /// fails on a backend error; the built-in list is served instead.
    pub async fn list_countries(&self) -> Result<Vec<Country>, PortalError> {
        let scope = self.capabilities(None).catalog_scope();
        let key = QueryKey::Countries {
            scope: scope.into(),
        };
        let countries = self.countries();
        let fetched = self
            .cache
            .get_or_fetch(key, || countries.fetch(scope))
            .await;
        countries::LIST_POLICY.apply(fetched, countries::fallback_countries)
    }

    pub async fn create_country(&self, input: &NewCountry) -> Result<Country, PortalError> {
        self.capabilities(None).require(Operation::CreateCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::new("create-country"),
                &[QueryScope::Countries],
                self.countries().create(input),
            )
            .await
    }

    pub async fn update_country(
        &self,
        id: &str,
        changes: &CountryUpdate,
    ) -> Result<Country, PortalError> {
        self.capabilities(None).require(Operation::UpdateCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::on("update-country", id),
                &[QueryScope::Countries],
                self.countries().update(id, changes),
            )
            .await
    }

    pub async fn set_country_status(
        &self,
        country: &Country,
        status: CountryStatus,
    ) -> Result<Country, PortalError> {
        self.capabilities(None).require(Operation::ToggleCatalogEntry)?;
        let changes = CountryUpdate {
            flag: country.flag.clone(),
            status,
        };
        self.mutations
            .run(
                ActionKey::on("update-country", &country.id),
                &[QueryScope::Countries],
                self.countries().update(&country.id, &changes),
            )
            .await
    }

    pub async fn delete_country(&self, id: &str) -> Result<(), PortalError> {
        self.capabilities(None).require(Operation::DeleteCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::on("delete-country", id),
                &[QueryScope::Countries],
                self.countries().delete(id),
            )
            .await
    }

    // --- Products ---

    pub async fn list_products(&self) -> Result<Vec<Product>, PortalError> {
        let scope = self.capabilities(None).catalog_scope();
        let key = QueryKey::Products {
            scope: scope.into(),
        };
        let products = self.products();
        let fetched = self
            .cache
            .get_or_fetch(key, || products.fetch(scope))
            .await;
        products::LIST_POLICY.apply(fetched, products::fallback_products)
    }

    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, PortalError> {
        self.capabilities(None).require(Operation::CreateCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::new("create-product"),
                &[QueryScope::Products],
                self.products().create(input),
            )
            .await
    }

    pub async fn update_product(
        &self,
        id: &str,
        input: &ProductInput,
    ) -> Result<Product, PortalError> {
        self.capabilities(None).require(Operation::UpdateCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::on("update-product", id),
                &[QueryScope::Products],
                self.products().update(id, input),
            )
            .await
    }

    pub async fn set_product_status(
        &self,
        product: &Product,
        status: ProductStatus,
    ) -> Result<Product, PortalError> {
        self.capabilities(None).require(Operation::ToggleCatalogEntry)?;
        let input = ProductInput {
            name: product.name.clone(),
            description: Some(product.description.clone()),
            status,
        };
        self.mutations
            .run(
                ActionKey::on("update-product", &product.id),
                &[QueryScope::Products],
                self.products().update(&product.id, &input),
            )
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<String, PortalError> {
        self.capabilities(None).require(Operation::DeleteCatalogEntry)?;
        self.mutations
            .run(
                ActionKey::on("delete-product", id),
                &[QueryScope::Products],
                self.products().delete(id),
            )
            .await
    }

    // --- User accounts ---

    pub async fn list_user_accounts(&self) -> Result<Vec<UserAccount>, PortalError> {
        self.capabilities(None).require(Operation::ListUserAccounts)?;
        let accounts = self.user_accounts();
        self.cache
            .get_or_fetch(QueryKey::UserAccounts, || accounts.list())
            .await
    }

    pub async fn update_user_account(
        &self,
        id: &str,
        changes: &UserAccountUpdate,
    ) -> Result<UserAccount, PortalError> {
        self.capabilities(None).require(Operation::UpdateUserAccount)?;
        self.mutations
            .run(
                ActionKey::on("update-user-account", id),
                &[QueryScope::UserAccounts],
                self.user_accounts().update(id, changes),
            )
            .await
    }

    pub fn create_user_account(&self) -> Result<UserAccount, PortalError> {
        self.user_accounts().create()
    }

    pub fn delete_user_account(&self, id: &str) -> Result<(), PortalError> {
        self.user_accounts().delete(id)
    }

    // --- Product pairings ---

    pub async fn list_pairings(&self, client_id: &str) -> Result<Vec<ProductPairing>, PortalError> {
        self.capabilities(Some(client_id))
            .require(Operation::ListPairings)?;
        let key = QueryKey::Pairings {
            client_id: client_id.to_string(),
        };
        let pairings = self.pairings();
        let fetched = self
            .cache
            .get_or_fetch(key, || pairings.fetch_pairs(client_id))
            .await;
        pairings::LIST_POLICY.apply(fetched, Vec::new)
    }

    pub async fn add_pair(&self, input: &NewPairing) -> Result<ProductPairing, PortalError> {
        self.capabilities(Some(&input.client_id))
            .require(Operation::CreatePairing)?;
        self.mutations
            .run(
                ActionKey::on("add-pair", &input.client_id),
                &[QueryScope::Pairings(input.client_id.clone())],
                self.pairings().add_pair(input),
            )
            .await
    }

    /// Only the callback URL and PIN of a pairing can be edited.
    pub async fn update_pair(
        &self,
        pairing: &ProductPairing,
        changes: &PairingUpdate,
    ) -> Result<ProductPairing, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::EditPairing)?;
        self.mutations
            .run(
                ActionKey::on("update-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().update_pair(&pairing.record_id, changes),
            )
            .await
    }

    /// Admin approval of a pending pairing. The PIN is checked before any
    /// request and is not retained.
    pub async fn approve_pair(
        &self,
        pairing: &ProductPairing,
        approval_pin: &str,
    ) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::ApprovePairing)?;
        approval::validate_pin(approval_pin)?;
        let next = self.check_transition(pairing, Transition::Approve)?;

        self.mutations
            .run(
                ActionKey::on("approve-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().approve_pair(&pairing.record_id, approval_pin),
            )
            .await?;
        Ok(next)
    }

    pub async fn reject_pair(&self, pairing: &ProductPairing) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::RejectPairing)?;
        let next = self.check_transition(pairing, Transition::Reject)?;
        self.mutations
            .run(
                ActionKey::on("reject-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().reject_product(&pairing.record_id),
            )
            .await?;
        Ok(next)
    }

    pub async fn activate_pair(&self, pairing: &ProductPairing) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::ActivatePairing)?;
        let next = self.check_transition(pairing, Transition::Activate)?;
        self.mutations
            .run(
                ActionKey::on("activate-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().activate_product(&pairing.record_id),
            )
            .await?;
        Ok(next)
    }

    /// Admin deactivation.
    pub async fn deactivate_pair(&self, pairing: &ProductPairing) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::DeactivatePairing)?;
        let next = self.check_transition(pairing, Transition::Deactivate)?;
        self.mutations
            .run(
                ActionKey::on("deactivate-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().deactivate_product(&pairing.record_id),
            )
            .await?;
        Ok(next)
    }

    /// Owner deactivation of one's own pairing.
    pub async fn deactivate_own_pair(
        &self,
        pairing: &ProductPairing,
    ) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::DeactivateOwnPairing)?;
        let next = self.check_transition(pairing, Transition::DeactivateOwn)?;
        self.mutations
            .run(
                ActionKey::on("deactivate-own-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().deactivate_pair(&pairing.record_id),
            )
            .await?;
        Ok(next)
    }

    pub async fn remove_pair(&self, pairing: &ProductPairing) -> Result<AssignmentStatus, PortalError> {
        self.capabilities(Some(&pairing.client_id))
            .require(Operation::RemovePairing)?;
        let next = self.check_transition(pairing, Transition::Remove)?;
        self.mutations
            .run(
                ActionKey::on("remove-pair", &pairing.record_id),
                &[QueryScope::Pairings(pairing.client_id.clone())],
                self.pairings().remove_pair(&pairing.record_id),
            )
            .await?;
        Ok(next)
    }

    fn check_transition(
        &self,
        pairing: &ProductPairing,
        transition: Transition,
    ) -> Result<AssignmentStatus, PortalError> {
        approval::next_status(pairing.assignment_status, transition, self.access_level())
    }
}

//! Reference data: airports, airplanes, people and routes, plus plain
//! listings over a snapshot.

use aerotrack_core::{
    Airplane, Airport, CoreError, CoreResult, Flight, FlightId, LicenseType, Location, NetworkSnapshot, Person,
    PersonId, PersonRole, Route,
};
use serde::Serialize;
use tracing::info;

use crate::service::FlightOps;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PilotLicenseRow {
    pub person_id: PersonId,
    pub license: LicenseType,
}

impl FlightOps {
    pub async fn add_airport(&self, airport: Airport) -> CoreResult<Airport> {
        if airport.name.trim().is_empty() {
            return Err(CoreError::Validation(format!("airport {} needs a name", airport.code)));
        }
        self.bounded("add_airport", async {
            let mut tx = self.store().begin().await?;
            tx.insert_airport(&airport).await?;
            tx.commit().await
        })
        .await?;
        info!("Added airport {}", airport.code);
        Ok(airport)
    }

    pub async fn add_airplane(&self, airplane: Airplane) -> CoreResult<Airplane> {
        airplane.validate()?;
        self.bounded("add_airplane", async {
            let mut tx = self.store().begin().await?;
            tx.insert_airplane(&airplane).await?;
            tx.commit().await
        })
        .await?;
        info!("Added airplane {} at {}", airplane.key, airplane.location);
        Ok(airplane)
    }

    /// New people start without a command; assignments go through
    /// `assign_pilot`.
    pub async fn add_person(&self, mut person: Person) -> CoreResult<Person> {
        if person.id.as_str().trim().is_empty() || person.first_name.trim().is_empty() {
            return Err(CoreError::Validation("personID and first name are required".into()));
        }
        if let PersonRole::Pilot(pilot) = &mut person.role {
            if pilot.tax_id.trim().is_empty() {
                return Err(CoreError::Validation(format!("pilot {} needs a tax id", person.id)));
            }
            pilot.commanding_flight = None;
        }
        self.bounded("add_person", async {
            let mut tx = self.store().begin().await?;
            tx.insert_person(&person).await?;
            tx.commit().await
        })
        .await?;
        info!("Added person {} at {}", person.id, person.location);
        Ok(person)
    }

    pub async fn add_route(&self, route: Route) -> CoreResult<Route> {
        route.validate()?;
        self.bounded("add_route", async {
            let mut tx = self.store().begin().await?;
            tx.insert_route(&route).await?;
            tx.commit().await
        })
        .await?;
        info!("Added route {} with {} legs", route.id, route.leg_count());
        Ok(route)
    }

    pub async fn snapshot(&self) -> CoreResult<NetworkSnapshot> {
        self.bounded("snapshot", self.store().snapshot()).await
    }

    pub async fn pilots(&self) -> CoreResult<Vec<Person>> {
        Ok(self.snapshot().await?.people.into_iter().filter(Person::is_pilot).collect())
    }

    pub async fn pilot_licenses(&self) -> CoreResult<Vec<PilotLicenseRow>> {
        Ok(license_rows(&self.snapshot().await?))
    }

    pub async fn licenses_of(&self, person_id: &PersonId) -> CoreResult<Vec<LicenseType>> {
        let snapshot = self.snapshot().await?;
        let person = snapshot
            .people
            .iter()
            .find(|p| &p.id == person_id)
            .ok_or_else(|| CoreError::NotFound(format!("person {}", person_id)))?;
        let pilot = person
            .pilot()
            .ok_or_else(|| CoreError::NotFound(format!("pilot {}", person_id)))?;
        Ok(pilot.licenses.iter().cloned().collect())
    }

    pub async fn flights(&self) -> CoreResult<Vec<Flight>> {
        Ok(self.snapshot().await?.flights)
    }

    /// Everyone currently aboard the airplane supporting `flight_id`.
    pub async fn boarded_passengers(&self, flight_id: &FlightId) -> CoreResult<Vec<Person>> {
        let snapshot = self.snapshot().await?;
        let flight = snapshot
            .flight(flight_id)
            .ok_or_else(|| CoreError::NotFound(format!("flight {}", flight_id)))?;
        let Some(key) = &flight.airplane else {
            return Ok(Vec::new());
        };
        let aboard = Location::Airplane(key.clone());
        let people: Vec<Person> = snapshot.people_at(&aboard).cloned().collect();
        Ok(people)
    }
}

fn license_rows(snapshot: &NetworkSnapshot) -> Vec<PilotLicenseRow> {
    snapshot
        .people
        .iter()
        .filter_map(|p| p.pilot().map(|pilot| (p, pilot)))
        .flat_map(|(person, pilot)| {
            pilot.licenses.iter().map(move |license| PilotLicenseRow {
                person_id: person.id.clone(),
                license: license.clone(),
            })
        })
        .collect()
}

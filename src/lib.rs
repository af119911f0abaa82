// Bibliothèque du jeu Trapdoor
// Expose tous les modules pour utilisation externe (par le binaire et les tests)

pub mod types;    // Tuiles, positions, directions, constantes
pub mod error;    // Erreurs de chargement et d'acteurs
pub mod config;   // Paramètres du jeu (JSON)
pub mod map;      // Grille et lecture de la carte
pub mod signal;   // Redessin, position du joueur, barre de statut
pub mod world;    // Acteur propriétaire de la carte
pub mod health;   // Acteur propriétaire des points de vie
pub mod enemy;    // Un acteur autonome par ennemi
pub mod healing;  // Cycle de soin temporisé
pub mod input;    // Décodage du clavier
pub mod display;  // Rendu terminal
pub mod game;     // Façade : démarrage, actions du joueur, victoire/défaite

// Ré-exportation des types principaux pour faciliter l'importation
pub use config::GameConfig;
pub use error::{GameError, GameResult};
pub use game::{Game, Outcome};
pub use input::InputEvent;
pub use map::{Grid, LoadedMap};
pub use types::*;
